//! Composition root: config, adapters, identity, then the interactive shell.

use std::sync::Arc;

use tracing::info;

use newsroom_core::{
    auth, config::Config, domain::UserProfile, logging, ports::DataService, repo::Repository,
    views::Flow, Error, Result,
};
use newsroom_supabase::{SupabaseRealtime, SupabaseRest};

mod shell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("newsroom")?;
    let cfg = Config::load()?;

    let rest = Arc::new(SupabaseRest::new(
        &cfg.supabase_url,
        &cfg.supabase_anon_key,
        cfg.request_timeout,
    )?);
    let live = Arc::new(SupabaseRealtime::new(
        &cfg.supabase_url,
        &cfg.supabase_anon_key,
        cfg.realtime_heartbeat,
    ));

    // A missing payload is a config problem; a bad one is an auth problem.
    let raw = cfg.telegram_init_data.as_deref().ok_or_else(|| {
        anyhow::anyhow!("TELEGRAM_INIT_DATA is required (the launch payload from the host)")
    })?;

    let viewer = match sign_in(rest.as_ref(), raw, cfg.telegram_bot_token.as_deref()).await {
        Ok(profile) => profile,
        Err(Error::Auth(reason)) => {
            // No usable identity is a fallback screen, not a crash.
            println!("Sign-in unavailable: {reason}");
            println!("Open this app from inside Telegram to read and post.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(user = %viewer.id, role = %viewer.role, "signed in");

    let flow = Flow::start(Repository::new(rest), live, viewer, cfg.page_size).await?;
    shell::run(flow, cfg.app_url).await?;
    Ok(())
}

/// Parse the launch payload and resolve the viewer's profile. Every identity
/// failure, whether a tampered/malformed payload or a userless context,
/// surfaces as `Error::Auth` so the caller has a single fallback path.
async fn sign_in(
    store: &dyn DataService,
    raw_init_data: &str,
    bot_token: Option<&str>,
) -> Result<UserProfile> {
    let ctx = newsroom_telegram::parse_init_data(raw_init_data, bot_token)?;
    if let Some(platform) = &ctx.platform {
        info!(platform, dark_theme = ctx.dark_theme, "launch context");
    }
    auth::authenticate(store, &ctx).await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use newsroom_core::{
        domain::{
            Article, ArticleDetail, ArticleId, ArticleSummary, Comment, CommentId, ReactionId,
            ReactionRow, Role, UserId, UserProfile,
        },
        ports::{ArticlePatch, NewArticle, NewComment, NewProfile, NewReaction},
    };

    use super::*;

    /// Backendless store: any call is a repository error, so a test that gets
    /// `Error::Auth` back proves sign-in failed before touching the backend.
    struct NoBackend;

    fn unreached<T>() -> Result<T> {
        Err(Error::Repository("no backend in this test".to_string()))
    }

    #[async_trait]
    impl DataService for NoBackend {
        async fn profile(&self, _id: UserId) -> Result<Option<UserProfile>> {
            unreached()
        }
        async fn insert_profile(&self, _profile: NewProfile) -> Result<UserProfile> {
            unreached()
        }
        async fn search_profiles(&self, _needle: &str, _limit: usize) -> Result<Vec<UserProfile>> {
            unreached()
        }
        async fn update_role(&self, _id: UserId, _role: Role) -> Result<UserProfile> {
            unreached()
        }
        async fn published_articles(
            &self,
            _limit: usize,
            _offset: usize,
        ) -> Result<Vec<ArticleSummary>> {
            unreached()
        }
        async fn article_with_relations(&self, _id: ArticleId) -> Result<Option<ArticleDetail>> {
            unreached()
        }
        async fn articles_by_author(&self, _author: UserId) -> Result<Vec<Article>> {
            unreached()
        }
        async fn insert_article(&self, _article: NewArticle) -> Result<Article> {
            unreached()
        }
        async fn update_article(&self, _id: ArticleId, _patch: ArticlePatch) -> Result<Article> {
            unreached()
        }
        async fn comment_with_author(&self, _id: CommentId) -> Result<Option<Comment>> {
            unreached()
        }
        async fn insert_comment(&self, _comment: NewComment) -> Result<Comment> {
            unreached()
        }
        async fn reactions_for(&self, _article: ArticleId) -> Result<Vec<ReactionRow>> {
            unreached()
        }
        async fn find_reaction(
            &self,
            _article: ArticleId,
            _user: UserId,
            _emoji: &str,
        ) -> Result<Option<ReactionId>> {
            unreached()
        }
        async fn insert_reaction(&self, _reaction: NewReaction) -> Result<ReactionRow> {
            unreached()
        }
        async fn delete_reaction(&self, _id: ReactionId) -> Result<()> {
            unreached()
        }
    }

    #[tokio::test]
    async fn tampered_payload_is_an_auth_failure_not_a_backend_one() {
        let raw = "auth_date=1&user=%7B%22id%22%3A1%7D&hash=deadbeef";
        let err = sign_in(&NoBackend, raw, Some("12345:token"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn malformed_user_json_is_an_auth_failure() {
        let err = sign_in(&NoBackend, "user=notjson", None).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn userless_payload_is_an_auth_failure() {
        let err = sign_in(&NoBackend, "platform=ios", None).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
