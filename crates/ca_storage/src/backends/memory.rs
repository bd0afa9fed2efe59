use async_trait::async_trait;
use ca_core::{Article, ArticleStore, Result, Upserted};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process store used by the tests and by dry runs. Mirrors the
/// postgres backend's URL-keyed idempotency.
pub struct MemoryStore {
    articles: Arc<RwLock<Vec<(Uuid, Article)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            articles: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn get(&self, url: &str) -> Option<Article> {
        self.articles
            .read()
            .await
            .iter()
            .find(|(_, a)| a.url == url)
            .map(|(_, a)| a.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        Ok(self.articles.read().await.iter().any(|(_, a)| a.url == url))
    }

    async fn upsert(&self, article: &Article) -> Result<Upserted> {
        let mut articles = self.articles.write().await;
        if let Some((id, _)) = articles.iter().find(|(_, a)| a.url == article.url) {
            return Ok(Upserted {
                id: *id,
                created: false,
            });
        }
        let id = Uuid::new_v4();
        articles.push((id, article.clone()));
        Ok(Upserted { id, created: true })
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .articles
            .read()
            .await
            .iter()
            .map(|(_, a)| a.clone())
            .collect();
        // Newest first; undated articles sort after dated ones.
        articles.sort_by(|a, b| {
            b.published_date
                .cmp(&a.published_date)
                .then(b.scraped_at.cmp(&a.scraped_at))
        });
        Ok(articles.into_iter().take(limit).collect())
    }
}
