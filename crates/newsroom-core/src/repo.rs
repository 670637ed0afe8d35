use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{
        Article, ArticleDetail, ArticleId, Comment, CommentId, ReactionRow, Role, UserId,
        UserProfile,
    },
    ports::{ArticlePatch, DataService, NewArticle, NewComment, NewReaction},
    Error, Result,
};

/// Admin user search is capped, matching the source behavior.
const MAX_USER_SEARCH_RESULTS: usize = 10;

/// Caller-facing partial update for an article.
#[derive(Clone, Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
}

/// Repository facade: the set of functions mediating all reads and writes
/// against the remote data service.
///
/// Every operation is a single round trip (plus the find in the reaction
/// toggle); nothing retries, and a transport failure surfaces to the caller
/// as-is.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DataService>,
}

impl Repository {
    pub fn new(store: Arc<dyn DataService>) -> Self {
        Self { store }
    }

    /// Published articles only, newest first, with aggregate counts. A failed
    /// query yields no partial result.
    pub async fn list_published(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<crate::domain::ArticleSummary>> {
        self.store.published_articles(limit, offset).await
    }

    /// Full article detail: author, comments ascending by creation time, and
    /// the raw reaction rows.
    pub async fn article(&self, id: ArticleId) -> Result<ArticleDetail> {
        self.store
            .article_with_relations(id)
            .await?
            .ok_or(Error::NotFound("article"))
    }

    /// A single comment with its author expanded (used by the live channel to
    /// materialize insert events).
    pub async fn comment(&self, id: CommentId) -> Result<Option<Comment>> {
        self.store.comment_with_author(id).await
    }

    pub async fn reactions(&self, article: ArticleId) -> Result<Vec<ReactionRow>> {
        self.store.reactions_for(article).await
    }

    /// New articles are always unpublished drafts.
    pub async fn create_article(
        &self,
        title: &str,
        content: &str,
        author: UserId,
    ) -> Result<Article> {
        self.store
            .insert_article(NewArticle {
                title: title.to_string(),
                content: content.to_string(),
                author_id: author,
                is_published: false,
            })
            .await
    }

    /// Partial update, stamping `updated_at` on every call. Last writer wins;
    /// there is no version check.
    pub async fn update_article(&self, id: ArticleId, changes: ArticleChanges) -> Result<Article> {
        self.store
            .update_article(
                id,
                ArticlePatch {
                    title: changes.title,
                    content: changes.content,
                    is_published: changes.is_published,
                    updated_at: Utc::now(),
                },
            )
            .await
    }

    /// Publish is an update to `is_published = true`; republishing an already
    /// published article is a no-op transition, not an error.
    pub async fn publish(&self, id: ArticleId) -> Result<Article> {
        self.update_article(
            id,
            ArticleChanges {
                is_published: Some(true),
                ..ArticleChanges::default()
            },
        )
        .await
    }

    /// Post a comment. Empty or whitespace-only content is rejected locally:
    /// `Ok(None)` without any remote call.
    pub async fn add_comment(
        &self,
        article: ArticleId,
        author: UserId,
        content: &str,
    ) -> Result<Option<Comment>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let comment = self
            .store
            .insert_comment(NewComment {
                article_id: article,
                author_id: author,
                content: content.to_string(),
            })
            .await?;
        Ok(Some(comment))
    }

    /// Toggle semantics: an existing (article, user, emoji) row is deleted
    /// and `None` returned; otherwise the row is inserted and returned.
    ///
    /// Switching emoji is two calls issued by the caller (retract old, add
    /// new) and is not atomic here.
    pub async fn toggle_reaction(
        &self,
        article: ArticleId,
        user: UserId,
        emoji: &str,
    ) -> Result<Option<ReactionRow>> {
        if let Some(id) = self.store.find_reaction(article, user, emoji).await? {
            self.store.delete_reaction(id).await?;
            return Ok(None);
        }
        let row = self
            .store
            .insert_reaction(NewReaction {
                article_id: article,
                user_id: user,
                emoji: emoji.to_string(),
            })
            .await?;
        Ok(Some(row))
    }

    /// All-digit queries are exact-id lookups; anything else is a
    /// case-insensitive substring match on username. Capped at ten results.
    pub async fn find_users(&self, query: &str) -> Result<Vec<UserProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if query.bytes().all(|b| b.is_ascii_digit()) {
            // A digit string too long for an id matches nothing.
            let Ok(id) = query.parse::<i64>() else {
                return Ok(Vec::new());
            };
            return Ok(self.store.profile(UserId(id)).await?.into_iter().collect());
        }
        self.store
            .search_profiles(query, MAX_USER_SEARCH_RESULTS)
            .await
    }

    pub async fn role_of(&self, user: UserId) -> Result<Role> {
        self.store
            .profile(user)
            .await?
            .map(|p| p.role)
            .ok_or(Error::NotFound("profile"))
    }

    /// Unconditionally overwrites the role. Restricting this to admin actors
    /// is the view layer's job; the operation itself enforces nothing.
    pub async fn set_role(&self, user: UserId, role: Role) -> Result<UserProfile> {
        self.store.update_role(user, role).await
    }

    /// The author's own articles, drafts included, newest first.
    pub async fn my_articles(&self, author: UserId) -> Result<Vec<Article>> {
        self.store.articles_by_author(author).await
    }
}
