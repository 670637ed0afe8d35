use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Client, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use newsroom_core::{
    domain::{
        Article, ArticleDetail, ArticleId, ArticleSummary, Comment, CommentId, ReactionId,
        ReactionRow, Role, UserId, UserProfile,
    },
    ports::{ArticlePatch, DataService, NewArticle, NewComment, NewProfile, NewReaction},
    Error, Result,
};

const AUTHOR_EMBED: &str =
    "author:user_profiles(id,username,first_name,last_name,photo_url,role,created_at)";

/// PostgREST client for the newsroom tables.
///
/// All requests carry the anon key; row-level security on the backend is the
/// real gatekeeper, this client only shapes queries.
pub struct SupabaseRest {
    http: Client,
    base: String,
}

impl SupabaseRest {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(anon_key)
            .map_err(|_| Error::Config("SUPABASE_ANON_KEY is not a valid header value".into()))?;
        headers.insert(HeaderName::from_static("apikey"), key);
        let bearer = HeaderValue::from_str(&format!("Bearer {anon_key}"))
            .map_err(|_| Error::Config("SUPABASE_ANON_KEY is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let resp = self
            .http
            .get(self.table_url(table))
            .query(query)
            .send()
            .await
            .map_err(http_err)?;
        decode(resp).await
    }

    /// Single-row convenience: zero rows is `Ok(None)`, never an error.
    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        Ok(self.select(table, query).await?.into_iter().next())
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&[("select", select)])
            .json(body)
            .send()
            .await
            .map_err(http_err)?;
        let rows: Vec<T> = decode(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Repository(format!("insert into {table} returned no rows")))
    }

    async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>> {
        let resp = self
            .http
            .patch(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(http_err)?;
        decode(resp).await
    }

    async fn delete(&self, table: &str, query: &[(&str, String)]) -> Result<()> {
        let resp = self
            .http
            .delete(self.table_url(table))
            .query(query)
            .send()
            .await
            .map_err(http_err)?;
        expect_ok(resp).await?;
        Ok(())
    }
}

fn http_err(e: reqwest::Error) -> Error {
    Error::Repository(e.to_string())
}

async fn expect_ok(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Repository(format!("{status}: {body}")))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Vec<T>> {
    expect_ok(resp).await?.json().await.map_err(http_err)
}

fn summary_select() -> String {
    format!("*,{AUTHOR_EMBED},comments(count),reactions(count)")
}

fn detail_select() -> String {
    format!("*,{AUTHOR_EMBED},comments(*,{AUTHOR_EMBED}),reactions(id,user_id,emoji)")
}

fn comment_select() -> String {
    format!("*,{AUTHOR_EMBED}")
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}

/// List-page row: the article columns with the author and embedded counts.
#[derive(Debug, Deserialize)]
struct SummaryRow {
    #[serde(flatten)]
    article: Article,
    author: UserProfile,
    #[serde(default)]
    comments: Vec<CountRow>,
    #[serde(default)]
    reactions: Vec<CountRow>,
}

impl From<SummaryRow> for ArticleSummary {
    fn from(row: SummaryRow) -> Self {
        ArticleSummary {
            article: row.article,
            author: row.author,
            comments_count: row.comments.first().map(|c| c.count).unwrap_or(0),
            reactions_count: row.reactions.first().map(|c| c.count).unwrap_or(0),
        }
    }
}

/// Detail row: author, ordered comments with their authors, raw reaction rows.
#[derive(Debug, Deserialize)]
struct DetailRow {
    #[serde(flatten)]
    article: Article,
    author: UserProfile,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    reactions: Vec<ReactionRow>,
}

impl From<DetailRow> for ArticleDetail {
    fn from(row: DetailRow) -> Self {
        ArticleDetail {
            article: row.article,
            author: row.author,
            comments: row.comments,
            reactions: row.reactions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReactionKey {
    id: ReactionId,
}

#[derive(Serialize)]
struct RolePatch {
    role: Role,
}

#[async_trait]
impl DataService for SupabaseRest {
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        self.select_one("user_profiles", &[("id", format!("eq.{id}"))])
            .await
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<UserProfile> {
        self.insert("user_profiles", "*", &profile).await
    }

    async fn search_profiles(&self, needle: &str, limit: usize) -> Result<Vec<UserProfile>> {
        self.select(
            "user_profiles",
            &[
                ("username", format!("ilike.*{needle}*")),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn update_role(&self, id: UserId, role: Role) -> Result<UserProfile> {
        let rows: Vec<UserProfile> = self
            .update(
                "user_profiles",
                &[("id", format!("eq.{id}"))],
                &RolePatch { role },
            )
            .await?;
        rows.into_iter().next().ok_or(Error::NotFound("user"))
    }

    async fn published_articles(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ArticleSummary>> {
        let rows: Vec<SummaryRow> = self
            .select(
                "articles",
                &[
                    ("select", summary_select()),
                    ("is_published", "eq.true".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn article_with_relations(&self, id: ArticleId) -> Result<Option<ArticleDetail>> {
        let row: Option<DetailRow> = self
            .select_one(
                "articles",
                &[
                    ("select", detail_select()),
                    ("id", format!("eq.{id}")),
                    ("comments.order", "created_at.asc".to_string()),
                ],
            )
            .await?;
        Ok(row.map(Into::into))
    }

    async fn articles_by_author(&self, author: UserId) -> Result<Vec<Article>> {
        self.select(
            "articles",
            &[
                ("author_id", format!("eq.{author}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        self.insert("articles", "*", &article).await
    }

    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Article> {
        let rows: Vec<Article> = self
            .update("articles", &[("id", format!("eq.{id}"))], &patch)
            .await?;
        rows.into_iter().next().ok_or(Error::NotFound("article"))
    }

    async fn comment_with_author(&self, id: CommentId) -> Result<Option<Comment>> {
        self.select_one(
            "comments",
            &[("select", comment_select()), ("id", format!("eq.{id}"))],
        )
        .await
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        self.insert("comments", &comment_select(), &comment).await
    }

    async fn reactions_for(&self, article: ArticleId) -> Result<Vec<ReactionRow>> {
        self.select(
            "reactions",
            &[
                ("select", "id,user_id,emoji".to_string()),
                ("article_id", format!("eq.{article}")),
            ],
        )
        .await
    }

    async fn find_reaction(
        &self,
        article: ArticleId,
        user: UserId,
        emoji: &str,
    ) -> Result<Option<ReactionId>> {
        let row: Option<ReactionKey> = self
            .select_one(
                "reactions",
                &[
                    ("select", "id".to_string()),
                    ("article_id", format!("eq.{article}")),
                    ("user_id", format!("eq.{user}")),
                    ("emoji", format!("eq.{emoji}")),
                ],
            )
            .await?;
        Ok(row.map(|r| r.id))
    }

    async fn insert_reaction(&self, reaction: NewReaction) -> Result<ReactionRow> {
        self.insert("reactions", "id,user_id,emoji", &reaction).await
    }

    async fn delete_reaction(&self, id: ReactionId) -> Result<()> {
        self.delete("reactions", &[("id", format!("eq.{id}"))]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR_JSON: &str = r#"{
        "id": 7,
        "username": "lena",
        "first_name": "Lena",
        "last_name": "K",
        "photo_url": null,
        "role": "editor",
        "created_at": "2024-01-01T00:00:00Z"
    }"#;

    fn summary_json() -> String {
        format!(
            r#"{{
                "id": "8b9e2f8e-6f7d-4d4a-9d2e-111111111111",
                "title": "hello",
                "content": "<p>hi</p>",
                "author_id": 7,
                "is_published": true,
                "views_count": 3,
                "created_at": "2024-01-02T00:00:00Z",
                "updated_at": "2024-01-02T00:00:00Z",
                "author": {AUTHOR_JSON},
                "comments": [{{"count": 2}}],
                "reactions": [{{"count": 5}}]
            }}"#
        )
    }

    #[test]
    fn summary_row_decodes_with_embedded_counts() {
        let row: SummaryRow = serde_json::from_str(&summary_json()).unwrap();
        let summary = ArticleSummary::from(row);
        assert_eq!(summary.article.title, "hello");
        assert_eq!(summary.author.username, "lena");
        assert_eq!(summary.comments_count, 2);
        assert_eq!(summary.reactions_count, 5);
    }

    #[test]
    fn summary_row_tolerates_missing_count_embeds() {
        let json = summary_json()
            .replace(r#""comments": [{"count": 2}],"#, "")
            .replace(r#""reactions": [{"count": 5}]"#, r#""views_ignored": 0"#);
        let row: SummaryRow = serde_json::from_str(&json).unwrap();
        let summary = ArticleSummary::from(row);
        assert_eq!(summary.comments_count, 0);
        assert_eq!(summary.reactions_count, 0);
    }

    #[test]
    fn detail_row_decodes_comments_and_reactions() {
        let json = format!(
            r#"{{
                "id": "8b9e2f8e-6f7d-4d4a-9d2e-111111111111",
                "title": "hello",
                "content": "<p>hi</p>",
                "author_id": 7,
                "is_published": true,
                "views_count": 3,
                "created_at": "2024-01-02T00:00:00Z",
                "updated_at": "2024-01-02T00:00:00Z",
                "author": {AUTHOR_JSON},
                "comments": [{{
                    "id": "8b9e2f8e-6f7d-4d4a-9d2e-222222222222",
                    "article_id": "8b9e2f8e-6f7d-4d4a-9d2e-111111111111",
                    "author_id": 7,
                    "author": {AUTHOR_JSON},
                    "content": "first",
                    "created_at": "2024-01-03T00:00:00Z"
                }}],
                "reactions": [{{
                    "id": "8b9e2f8e-6f7d-4d4a-9d2e-333333333333",
                    "user_id": 7,
                    "emoji": "👍"
                }}]
            }}"#
        );
        let detail = ArticleDetail::from(serde_json::from_str::<DetailRow>(&json).unwrap());
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].author.username, "lena");
        assert_eq!(detail.reactions[0].emoji, "👍");
    }

    #[test]
    fn select_strings_embed_the_author_columns() {
        assert!(summary_select().contains("author:user_profiles("));
        assert!(summary_select().contains("comments(count)"));
        assert!(detail_select().contains("comments(*,author:user_profiles("));
        assert_eq!(comment_select(), format!("*,{AUTHOR_EMBED}"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let rest = SupabaseRest::new(
            "https://proj.supabase.co/",
            "anon",
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            rest.table_url("articles"),
            "https://proj.supabase.co/rest/v1/articles"
        );
    }
}
