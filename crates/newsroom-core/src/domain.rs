use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Telegram user id (numeric, stable across logins).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Article id (backend uuid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

/// Comment id (backend uuid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub Uuid);

/// Reaction row id (backend uuid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Coarse capability level attached to a profile.
///
/// The derived ordering is the capability order: admin ⊇ editor ⊇ user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "editor" => Some(Role::Editor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// An article row as stored by the backend. Content is editor-produced HTML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub is_published: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-page projection: the article plus its author and aggregate counts.
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleSummary {
    pub article: Article,
    pub author: UserProfile,
    pub comments_count: usize,
    pub reactions_count: usize,
}

/// Detail projection: author expanded, comments ordered ascending by creation
/// time, and the raw reaction rows for client-side aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleDetail {
    pub article: Article,
    pub author: UserProfile,
    pub comments: Vec<Comment>,
    pub reactions: Vec<ReactionRow>,
}

/// A comment with its author expanded. Append-only: no edit or delete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub author: UserProfile,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A raw reaction row. At most one emoji per (article, user) pair is
/// maintained by the toggle semantics, not by a database constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionRow {
    pub id: ReactionId,
    pub user_id: UserId,
    pub emoji: String,
}

/// The fixed reaction set offered by the detail screen.
pub const EMOJI_OPTIONS: [&str; 6] = ["👍", "❤️", "😂", "😮", "😢", "😡"];

/// The user record handed over by the embedding host at startup.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LaunchUser {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Identity and platform hints from the launch context. A missing user is a
/// recoverable condition, not a crash.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaunchContext {
    pub user: Option<LaunchUser>,
    pub platform: Option<String>,
    pub dark_theme: bool,
}
