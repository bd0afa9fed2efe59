use std::sync::Arc;

use ca_core::{ArticleStore, Error, Result};

pub mod backends;

pub use backends::memory::MemoryStore;
pub use backends::postgres::PostgresStore;

/// Build a store from the configured backend name. `memory` needs no
/// connection string and is what the tests and dry runs use.
pub async fn create_store(backend: &str, database_url: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    match backend {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "postgres" => {
            let url = database_url
                .ok_or_else(|| Error::Storage("DATABASE_URL is required for the postgres backend".to_string()))?;
            Ok(Arc::new(PostgresStore::connect(url).await?))
        }
        other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::{create_store, MemoryStore, PostgresStore};
    pub use ca_core::{Article, ArticleStore, Result, Upserted};
}
