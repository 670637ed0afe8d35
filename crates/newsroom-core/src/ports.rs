use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{
        Article, ArticleDetail, ArticleId, ArticleSummary, Comment, CommentId, ReactionId,
        ReactionRow, Role, UserId, UserProfile,
    },
    live::{CommentInserted, ReactionChanged, Subscription},
    Result,
};

/// Insert payload for a first-login profile.
#[derive(Clone, Debug, Serialize)]
pub struct NewProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
}

/// Insert payload for an article. Drafts only: the facade never sets
/// `is_published` on creation.
#[derive(Clone, Debug, Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub is_published: bool,
}

/// Partial update for an article. `updated_at` is stamped by the facade on
/// every call; there is no version check, the last writer wins.
#[derive(Clone, Debug, Serialize)]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewComment {
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub content: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewReaction {
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub emoji: String,
}

/// Port to the remote relational data service.
///
/// This is the row-level capability surface the backend offers: filtered
/// selects with relation expansion, inserts/updates/deletes by key, ordering
/// and range pagination. Single-row lookups return `Ok(None)` for zero rows so
/// callers never inspect transport error internals. Supabase is the first
/// implementation; anything with the same row-level surface fits behind it.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>>;
    async fn insert_profile(&self, profile: NewProfile) -> Result<UserProfile>;
    async fn search_profiles(&self, needle: &str, limit: usize) -> Result<Vec<UserProfile>>;
    async fn update_role(&self, id: UserId, role: Role) -> Result<UserProfile>;

    /// Published articles only, newest first, with author and aggregate
    /// counts expanded.
    async fn published_articles(&self, limit: usize, offset: usize)
        -> Result<Vec<ArticleSummary>>;
    async fn article_with_relations(&self, id: ArticleId) -> Result<Option<ArticleDetail>>;
    /// All of an author's articles (drafts included), newest first.
    async fn articles_by_author(&self, author: UserId) -> Result<Vec<Article>>;
    async fn insert_article(&self, article: NewArticle) -> Result<Article>;
    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Article>;

    async fn comment_with_author(&self, id: CommentId) -> Result<Option<Comment>>;
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn reactions_for(&self, article: ArticleId) -> Result<Vec<ReactionRow>>;
    async fn find_reaction(
        &self,
        article: ArticleId,
        user: UserId,
        emoji: &str,
    ) -> Result<Option<ReactionId>>;
    async fn insert_reaction(&self, reaction: NewReaction) -> Result<ReactionRow>;
    async fn delete_reaction(&self, id: ReactionId) -> Result<()>;
}

/// Port to the per-table change-notification stream.
///
/// One subscription per open detail view per stream; the returned handle owns
/// the teardown. At-least-once delivery is assumed from the remote side.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Insert events on the comment stream, filtered by article.
    async fn subscribe_comments(&self, article: ArticleId)
        -> Result<Subscription<CommentInserted>>;

    /// Any change (insert/update/delete) on the reaction stream, filtered by
    /// article.
    async fn subscribe_reactions(
        &self,
        article: ArticleId,
    ) -> Result<Subscription<ReactionChanged>>;
}
