use async_trait::async_trait;
use uuid::Uuid;

use crate::types::Article;
use crate::Result;

/// Outcome of an idempotent upsert: the row's identity and whether this
/// call created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: Uuid,
    pub created: bool,
}

/// Narrow storage contract the ingestion engine depends on. All
/// idempotency flows through the article URL.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Cheap reachability check, run once at the start of a source run.
    async fn ping(&self) -> Result<()>;

    /// Whether an article with this URL has already been persisted.
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Insert the article with its sections and bullets as one atomic
    /// unit. If the URL is already present, return the existing id with
    /// `created = false` and leave the stored tree untouched.
    async fn upsert(&self, article: &Article) -> Result<Upserted>;

    /// Recently persisted articles, newest first by published date then
    /// ingestion time.
    async fn latest(&self, limit: usize) -> Result<Vec<Article>>;
}
