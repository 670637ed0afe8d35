use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::CommentId;

/// Kind of row change delivered on a live stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A new comment row appeared for the subscribed article.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommentInserted {
    pub comment_id: CommentId,
}

/// Some reaction row changed for the subscribed article. Carries no row data;
/// consumers refetch and recompute the aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReactionChanged {
    pub kind: ChangeKind,
}

/// Handle to an active live subscription.
///
/// Delivery order is the remote service's emission order; events are not
/// deduplicated. Dropping the handle (or calling [`Subscription::close`])
/// releases the remote subscription; teardown is never left to implicit
/// garbage collection.
pub struct Subscription<T> {
    events: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> Subscription<T> {
    pub fn new(events: mpsc::Receiver<T>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Next event, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<T> {
        self.events.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
