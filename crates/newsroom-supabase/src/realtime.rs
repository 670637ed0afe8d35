use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use newsroom_core::{
    domain::{ArticleId, CommentId},
    live::{ChangeKind, CommentInserted, ReactionChanged, Subscription},
    ports::LiveChannel,
    Error, Result,
};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Live channel over the Supabase realtime websocket (Phoenix framing).
///
/// One socket per subscription: the handle's cancellation tears down exactly
/// its own channel, with a `phx_leave` before the close.
pub struct SupabaseRealtime {
    socket_url: String,
    heartbeat: Duration,
}

impl SupabaseRealtime {
    pub fn new(base_url: &str, anon_key: &str, heartbeat: Duration) -> Self {
        Self {
            socket_url: socket_url(base_url, anon_key),
            heartbeat,
        }
    }

    async fn subscribe<T, F>(
        &self,
        table: &'static str,
        event: &str,
        article: ArticleId,
        map: F,
    ) -> Result<Subscription<T>>
    where
        T: Send + 'static,
        F: Fn(&Value) -> Option<T> + Send + 'static,
    {
        let (socket, _) = connect_async(&self.socket_url)
            .await
            .map_err(|e| Error::Repository(format!("realtime connect failed: {e}")))?;

        let topic = format!("realtime:{table}:{article}");
        let join = join_payload(table, event, article);
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        tokio::spawn(run_channel(
            socket,
            topic,
            join,
            self.heartbeat,
            tx,
            cancel.clone(),
            map,
        ));
        Ok(Subscription::new(rx, cancel))
    }
}

#[async_trait]
impl LiveChannel for SupabaseRealtime {
    async fn subscribe_comments(
        &self,
        article: ArticleId,
    ) -> Result<Subscription<CommentInserted>> {
        self.subscribe("comments", "INSERT", article, comment_event)
            .await
    }

    async fn subscribe_reactions(
        &self,
        article: ArticleId,
    ) -> Result<Subscription<ReactionChanged>> {
        self.subscribe("reactions", "*", article, reaction_event)
            .await
    }
}

/// One frame of the Phoenix channel protocol.
#[derive(Debug, Serialize, Deserialize)]
struct SocketMessage {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

fn socket_url(base_url: &str, anon_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0")
}

fn join_payload(table: &str, event: &str, article: ArticleId) -> Value {
    json!({
        "config": {
            "postgres_changes": [{
                "event": event,
                "schema": "public",
                "table": table,
                "filter": format!("article_id=eq.{article}"),
            }]
        }
    })
}

/// Extract the inserted comment id from a `postgres_changes` payload.
fn comment_event(payload: &Value) -> Option<CommentInserted> {
    let id = payload.get("data")?.get("record")?.get("id")?.as_str()?;
    let id = uuid::Uuid::parse_str(id).ok()?;
    Some(CommentInserted {
        comment_id: CommentId(id),
    })
}

fn reaction_event(payload: &Value) -> Option<ReactionChanged> {
    let kind = match payload.get("data")?.get("type")?.as_str()? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };
    Some(ReactionChanged { kind })
}

async fn send_frame(socket: &mut Socket, msg: &SocketMessage) -> Result<()> {
    let text = serde_json::to_string(msg)?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| Error::Repository(e.to_string()))
}

/// Drive one channel: join, heartbeats, incoming change events, leave on
/// cancellation. Ends when the socket closes, the receiver is dropped, or the
/// subscription handle cancels.
async fn run_channel<T, F>(
    mut socket: Socket,
    topic: String,
    join: Value,
    heartbeat: Duration,
    events: mpsc::Sender<T>,
    cancel: CancellationToken,
    map: F,
) where
    T: Send + 'static,
    F: Fn(&Value) -> Option<T> + Send + 'static,
{
    let mut seq: u64 = 0;
    seq += 1;
    let join_msg = SocketMessage {
        topic: topic.clone(),
        event: "phx_join".to_string(),
        payload: join,
        reference: Some(seq.to_string()),
    };
    if let Err(e) = send_frame(&mut socket, &join_msg).await {
        warn!("realtime join failed for {topic}: {e}");
        return;
    }

    let mut ticker = interval(heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick is immediate

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                seq += 1;
                let leave = SocketMessage {
                    topic: topic.clone(),
                    event: "phx_leave".to_string(),
                    payload: json!({}),
                    reference: Some(seq.to_string()),
                };
                let _ = send_frame(&mut socket, &leave).await;
                let _ = socket.close(None).await;
                return;
            }
            _ = ticker.tick() => {
                seq += 1;
                let hb = SocketMessage {
                    topic: "phoenix".to_string(),
                    event: "heartbeat".to_string(),
                    payload: json!({}),
                    reference: Some(seq.to_string()),
                };
                if let Err(e) = send_frame(&mut socket, &hb).await {
                    warn!("realtime heartbeat failed for {topic}: {e}");
                    return;
                }
            }
            frame = socket.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(msg) = serde_json::from_str::<SocketMessage>(&text) else {
                            continue;
                        };
                        if msg.topic != topic || msg.event != "postgres_changes" {
                            continue;
                        }
                        if let Some(event) = map(&msg.payload) {
                            if events.send(event).await.is_err() {
                                return; // receiver gone
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("realtime socket closed for {topic}");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("realtime socket error for {topic}: {e}");
                        return;
                    }
                }
            }
        }
    }
}
