use std::collections::BTreeMap;

use tracing::warn;

use crate::{
    domain::{Article, ArticleId, Comment, CommentId, ReactionRow, UserId, UserProfile},
    live::{CommentInserted, ReactionChanged, Subscription},
    ports::LiveChannel,
    repo::Repository,
    Result,
};

/// Per-emoji counts plus the emoji the viewer currently has set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactionSummary {
    pub counts: BTreeMap<String, usize>,
    pub viewer_emoji: Option<String>,
}

impl ReactionSummary {
    pub fn from_rows(rows: &[ReactionRow], viewer: UserId) -> Self {
        let mut counts = BTreeMap::new();
        let mut viewer_emoji = None;
        for row in rows {
            *counts.entry(row.emoji.clone()).or_insert(0) += 1;
            if row.user_id == viewer {
                viewer_emoji = Some(row.emoji.clone());
            }
        }
        Self {
            counts,
            viewer_emoji,
        }
    }

    pub fn count(&self, emoji: &str) -> usize {
        self.counts.get(emoji).copied().unwrap_or(0)
    }
}

/// A live event waiting to be applied to the detail view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveEvent {
    Comment(CommentInserted),
    Reaction(ReactionChanged),
}

/// Detail screen: the article, its ordered comments, and the live reaction
/// aggregate for the current viewer.
pub struct DetailView {
    repo: Repository,
    viewer: UserId,
    pub article: Article,
    pub author: UserProfile,
    pub comments: Vec<Comment>,
    pub reactions: ReactionSummary,
    comments_sub: Option<Subscription<CommentInserted>>,
    reactions_sub: Option<Subscription<ReactionChanged>>,
}

impl DetailView {
    pub async fn open(repo: Repository, viewer: UserId, id: ArticleId) -> Result<Self> {
        let detail = repo.article(id).await?;
        let reactions = ReactionSummary::from_rows(&detail.reactions, viewer);
        Ok(Self {
            repo,
            viewer,
            article: detail.article,
            author: detail.author,
            comments: detail.comments,
            reactions,
            comments_sub: None,
            reactions_sub: None,
        })
    }

    pub fn article_id(&self) -> ArticleId {
        self.article.id
    }

    /// Establish the per-article live subscriptions. Called when the view
    /// becomes active; [`DetailView::deactivate`] (or drop) releases them.
    pub async fn activate(&mut self, live: &dyn LiveChannel) -> Result<()> {
        self.comments_sub = Some(live.subscribe_comments(self.article.id).await?);
        self.reactions_sub = Some(live.subscribe_reactions(self.article.id).await?);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.comments_sub = None;
        self.reactions_sub = None;
    }

    /// Wait for the next live event on either stream. Returns `None` once the
    /// view is inactive or both streams have ended. Cancel-safe: dropping the
    /// returned future leaves the subscriptions in place.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        enum Pumped {
            Comment(Option<CommentInserted>),
            Reaction(Option<ReactionChanged>),
        }

        let comments = &mut self.comments_sub;
        let reactions = &mut self.reactions_sub;
        loop {
            let pumped = match (comments.as_mut(), reactions.as_mut()) {
                (None, None) => return None,
                (Some(c), None) => Pumped::Comment(c.next().await),
                (None, Some(r)) => Pumped::Reaction(r.next().await),
                (Some(c), Some(r)) => tokio::select! {
                    ev = c.next() => Pumped::Comment(ev),
                    ev = r.next() => Pumped::Reaction(ev),
                },
            };
            match pumped {
                Pumped::Comment(Some(ev)) => return Some(LiveEvent::Comment(ev)),
                Pumped::Reaction(Some(ev)) => return Some(LiveEvent::Reaction(ev)),
                Pumped::Comment(None) => *comments = None,
                Pumped::Reaction(None) => *reactions = None,
            }
        }
    }

    /// Apply a live event, refetching what it invalidated. A failed refetch is
    /// logged and dropped; the view keeps showing its stale state until the
    /// next successful event.
    pub async fn apply(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Comment(ev) => self.append_comment(ev.comment_id).await,
            LiveEvent::Reaction(_) => self.refresh_reactions().await,
        }
    }

    /// Fetch the newly-inserted comment with its author and append it. No
    /// dedup: a duplicate delivery appends a duplicate entry.
    async fn append_comment(&mut self, id: CommentId) {
        match self.repo.comment(id).await {
            Ok(Some(comment)) => self.comments.push(comment),
            Ok(None) => {}
            Err(e) => warn!("live comment fetch failed: {e}"),
        }
    }

    async fn refresh_reactions(&mut self) {
        match self.repo.reactions(self.article.id).await {
            Ok(rows) => self.reactions = ReactionSummary::from_rows(&rows, self.viewer),
            Err(e) => warn!("reaction refetch failed: {e}"),
        }
    }

    /// Tap behavior of the reaction bar: tapping the current emoji retracts
    /// it; tapping a different one retracts the old reaction first, then adds
    /// the new one. The switch is two separate remote calls, not atomic.
    pub async fn react(&mut self, emoji: &str) -> Result<()> {
        if self.reactions.viewer_emoji.as_deref() == Some(emoji) {
            self.repo
                .toggle_reaction(self.article.id, self.viewer, emoji)
                .await?;
        } else {
            if let Some(old) = self.reactions.viewer_emoji.clone() {
                self.repo
                    .toggle_reaction(self.article.id, self.viewer, &old)
                    .await?;
            }
            self.repo
                .toggle_reaction(self.article.id, self.viewer, emoji)
                .await?;
        }
        self.refresh_reactions().await;
        Ok(())
    }

    /// Post a comment and append it locally. Returns `false` for a
    /// whitespace-only input (nothing was sent).
    pub async fn comment(&mut self, text: &str) -> Result<bool> {
        match self.repo.add_comment(self.article.id, self.viewer, text).await? {
            Some(comment) => {
                self.comments.push(comment);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
