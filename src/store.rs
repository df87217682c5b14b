//! Store selection from `[store]`.

use std::sync::Arc;

use anyhow::Result;

use ragify_core::store::memory::InMemoryStore;
use ragify_core::store::VectorStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::sqlite_store::SqliteStore;

pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path).await?)),
    }
}
