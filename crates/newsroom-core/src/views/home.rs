use crate::{domain::ArticleSummary, repo::Repository, Result};

/// Home feed: published articles, newest first. Errors surface to the caller,
/// which renders an error state; a partial page is never shown.
pub struct HomeView {
    pub articles: Vec<ArticleSummary>,
    pub offset: usize,
}

impl HomeView {
    pub async fn load(repo: &Repository, limit: usize, offset: usize) -> Result<Self> {
        let articles = repo.list_published(limit, offset).await?;
        Ok(Self { articles, offset })
    }
}
