//! In-memory fakes behind the ports, for tests only.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    domain::{
        Article, ArticleDetail, ArticleId, ArticleSummary, Comment, CommentId, ReactionId,
        ReactionRow, Role, UserId, UserProfile,
    },
    live::{CommentInserted, ReactionChanged, Subscription},
    ports::{ArticlePatch, DataService, LiveChannel, NewArticle, NewComment, NewProfile,
        NewReaction},
    Error, Result,
};

#[derive(Default)]
struct StoreState {
    profiles: Vec<UserProfile>,
    articles: Vec<Article>,
    comments: Vec<Comment>,
    reactions: Vec<(ArticleId, ReactionRow)>,
    tick: i64,
}

/// Fake `DataService` with call counters, so tests can assert that an
/// operation issued no remote call at all.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    pub profile_inserts: AtomicUsize,
    pub article_inserts: AtomicUsize,
    pub comment_inserts: AtomicUsize,
    pub reaction_inserts: AtomicUsize,
    pub reaction_deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ts(state: &mut StoreState) -> DateTime<Utc> {
        state.tick += 1;
        Utc.timestamp_opt(state.tick, 0).single().unwrap()
    }

    pub fn seed_profile(&self, id: i64, username: &str, role: Role) -> UserProfile {
        let mut state = self.state.lock().unwrap();
        let created_at = Self::next_ts(&mut state);
        let profile = UserProfile {
            id: UserId(id),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: String::new(),
            photo_url: None,
            role,
            created_at,
        };
        state.profiles.push(profile.clone());
        profile
    }

    pub fn seed_article(&self, author: UserId, title: &str, published: bool) -> Article {
        let mut state = self.state.lock().unwrap();
        let ts = Self::next_ts(&mut state);
        let article = Article {
            id: ArticleId(Uuid::new_v4()),
            title: title.to_string(),
            content: format!("<p>{title}</p>"),
            author_id: author,
            is_published: published,
            views_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        state.articles.push(article.clone());
        article
    }

    pub fn seed_comment(&self, article: ArticleId, author: UserId, content: &str) -> Comment {
        let mut state = self.state.lock().unwrap();
        let created_at = Self::next_ts(&mut state);
        let author_profile = state
            .profiles
            .iter()
            .find(|p| p.id == author)
            .expect("seed the author profile first")
            .clone();
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            article_id: article,
            author_id: author,
            author: author_profile,
            content: content.to_string(),
            created_at,
        };
        state.comments.push(comment.clone());
        comment
    }

    pub fn reaction_rows(&self, article: ArticleId) -> Vec<ReactionRow> {
        let state = self.state.lock().unwrap();
        state
            .reactions
            .iter()
            .filter(|(a, _)| *a == article)
            .map(|(_, row)| row.clone())
            .collect()
    }
}

#[async_trait]
impl DataService for MemoryStore {
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let state = self.state.lock().unwrap();
        Ok(state.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<UserProfile> {
        self.profile_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(Error::Repository("duplicate profile id".to_string()));
        }
        let created_at = Self::next_ts(&mut state);
        let row = UserProfile {
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            photo_url: profile.photo_url,
            role: profile.role,
            created_at,
        };
        state.profiles.push(row.clone());
        Ok(row)
    }

    async fn search_profiles(&self, needle: &str, limit: usize) -> Result<Vec<UserProfile>> {
        let needle = needle.to_lowercase();
        let state = self.state.lock().unwrap();
        Ok(state
            .profiles
            .iter()
            .filter(|p| p.username.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_role(&self, id: UserId, role: Role) -> Result<UserProfile> {
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::NotFound("profile"))?;
        profile.role = role;
        Ok(profile.clone())
    }

    async fn published_articles(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ArticleSummary>> {
        let state = self.state.lock().unwrap();
        let mut published: Vec<&Article> = state
            .articles
            .iter()
            .filter(|a| a.is_published)
            .collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut out = Vec::new();
        for article in published.into_iter().skip(offset).take(limit) {
            let author = state
                .profiles
                .iter()
                .find(|p| p.id == article.author_id)
                .ok_or(Error::NotFound("profile"))?
                .clone();
            let comments_count = state
                .comments
                .iter()
                .filter(|c| c.article_id == article.id)
                .count();
            let reactions_count = state
                .reactions
                .iter()
                .filter(|(a, _)| *a == article.id)
                .count();
            out.push(ArticleSummary {
                article: article.clone(),
                author,
                comments_count,
                reactions_count,
            });
        }
        Ok(out)
    }

    async fn article_with_relations(&self, id: ArticleId) -> Result<Option<ArticleDetail>> {
        let state = self.state.lock().unwrap();
        let Some(article) = state.articles.iter().find(|a| a.id == id).cloned() else {
            return Ok(None);
        };
        let author = state
            .profiles
            .iter()
            .find(|p| p.id == article.author_id)
            .ok_or(Error::NotFound("profile"))?
            .clone();
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.article_id == id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let reactions = state
            .reactions
            .iter()
            .filter(|(a, _)| *a == id)
            .map(|(_, row)| row.clone())
            .collect();
        Ok(Some(ArticleDetail {
            article,
            author,
            comments,
            reactions,
        }))
    }

    async fn articles_by_author(&self, author: UserId) -> Result<Vec<Article>> {
        let state = self.state.lock().unwrap();
        let mut mine: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.author_id == author)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        self.article_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let ts = Self::next_ts(&mut state);
        let row = Article {
            id: ArticleId(Uuid::new_v4()),
            title: article.title,
            content: article.content,
            author_id: article.author_id,
            is_published: article.is_published,
            views_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        state.articles.push(row.clone());
        Ok(row)
    }

    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Article> {
        let mut state = self.state.lock().unwrap();
        let article = state
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::NotFound("article"))?;
        if let Some(title) = patch.title {
            article.title = title;
        }
        if let Some(content) = patch.content {
            article.content = content;
        }
        if let Some(is_published) = patch.is_published {
            article.is_published = is_published;
        }
        article.updated_at = patch.updated_at;
        Ok(article.clone())
    }

    async fn comment_with_author(&self, id: CommentId) -> Result<Option<Comment>> {
        let state = self.state.lock().unwrap();
        Ok(state.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        self.comment_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let created_at = Self::next_ts(&mut state);
        let author = state
            .profiles
            .iter()
            .find(|p| p.id == comment.author_id)
            .ok_or(Error::NotFound("profile"))?
            .clone();
        let row = Comment {
            id: CommentId(Uuid::new_v4()),
            article_id: comment.article_id,
            author_id: comment.author_id,
            author,
            content: comment.content,
            created_at,
        };
        state.comments.push(row.clone());
        Ok(row)
    }

    async fn reactions_for(&self, article: ArticleId) -> Result<Vec<ReactionRow>> {
        Ok(self.reaction_rows(article))
    }

    async fn find_reaction(
        &self,
        article: ArticleId,
        user: UserId,
        emoji: &str,
    ) -> Result<Option<ReactionId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .reactions
            .iter()
            .find(|(a, row)| *a == article && row.user_id == user && row.emoji == emoji)
            .map(|(_, row)| row.id))
    }

    async fn insert_reaction(&self, reaction: NewReaction) -> Result<ReactionRow> {
        self.reaction_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let row = ReactionRow {
            id: ReactionId(Uuid::new_v4()),
            user_id: reaction.user_id,
            emoji: reaction.emoji,
        };
        state.reactions.push((reaction.article_id, row.clone()));
        Ok(row)
    }

    async fn delete_reaction(&self, id: ReactionId) -> Result<()> {
        self.reaction_deletes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let before = state.reactions.len();
        state.reactions.retain(|(_, row)| row.id != id);
        if state.reactions.len() == before {
            return Err(Error::NotFound("reaction"));
        }
        Ok(())
    }
}

/// Fake `LiveChannel` whose events are fired manually by the test.
#[derive(Default)]
pub struct MemoryLive {
    comment_txs: Mutex<HashMap<ArticleId, Vec<mpsc::Sender<CommentInserted>>>>,
    reaction_txs: Mutex<HashMap<ArticleId, Vec<mpsc::Sender<ReactionChanged>>>>,
}

impl MemoryLive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a comment-insert event; returns how many live subscriptions
    /// received it.
    pub async fn fire_comment(&self, article: ArticleId, comment_id: CommentId) -> usize {
        let txs = {
            let map = self.comment_txs.lock().unwrap();
            map.get(&article).cloned().unwrap_or_default()
        };
        let mut delivered = 0;
        for tx in txs {
            if tx.send(CommentInserted { comment_id }).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn fire_reaction(&self, article: ArticleId, event: ReactionChanged) -> usize {
        let txs = {
            let map = self.reaction_txs.lock().unwrap();
            map.get(&article).cloned().unwrap_or_default()
        };
        let mut delivered = 0;
        for tx in txs {
            if tx.send(event).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait]
impl LiveChannel for MemoryLive {
    async fn subscribe_comments(
        &self,
        article: ArticleId,
    ) -> Result<Subscription<CommentInserted>> {
        let (tx, rx) = mpsc::channel(16);
        self.comment_txs
            .lock()
            .unwrap()
            .entry(article)
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx, CancellationToken::new()))
    }

    async fn subscribe_reactions(
        &self,
        article: ArticleId,
    ) -> Result<Subscription<ReactionChanged>> {
        let (tx, rx) = mpsc::channel(16);
        self.reaction_txs
            .lock()
            .unwrap()
            .entry(article)
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx, CancellationToken::new()))
    }
}
