use crate::{
    domain::{Article, ArticleId, UserId},
    repo::{ArticleChanges, Repository},
    Result,
};

/// Editor screen: the viewer's own articles, drafts included. Reached only
/// through the navigation guard (editor or admin).
pub struct EditorView {
    repo: Repository,
    author: UserId,
    pub articles: Vec<Article>,
}

impl EditorView {
    pub async fn open(repo: Repository, author: UserId) -> Result<Self> {
        let articles = repo.my_articles(author).await?;
        Ok(Self {
            repo,
            author,
            articles,
        })
    }

    pub async fn reload(&mut self) -> Result<()> {
        self.articles = self.repo.my_articles(self.author).await?;
        Ok(())
    }

    /// Create a new draft. Blank title or content is rejected locally:
    /// `Ok(None)` without a remote call.
    pub async fn create(&mut self, title: &str, content: &str) -> Result<Option<Article>> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Ok(None);
        }
        let article = self.repo.create_article(title, content, self.author).await?;
        self.reload().await?;
        Ok(Some(article))
    }

    pub async fn update(&mut self, id: ArticleId, title: &str, content: &str) -> Result<Article> {
        let article = self
            .repo
            .update_article(
                id,
                ArticleChanges {
                    title: Some(title.to_string()),
                    content: Some(content.to_string()),
                    ..ArticleChanges::default()
                },
            )
            .await?;
        self.reload().await?;
        Ok(article)
    }

    pub async fn publish(&mut self, id: ArticleId) -> Result<Article> {
        let article = self.repo.publish(id).await?;
        self.reload().await?;
        Ok(article)
    }
}
