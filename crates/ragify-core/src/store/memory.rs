//! In-memory [`VectorStore`] implementation.
//!
//! Entries are `Arc`s in a `HashMap` behind one `std::sync::RwLock`. An
//! upsert swaps a whole `Arc` under the write lock, so readers see either
//! the old or the new entry. Queries snapshot the `Arc`s under the read lock
//! and score them after releasing it. `clear` takes the write lock and
//! therefore waits for in-flight readers and writers.
//!
//! Vector search is brute-force cosine similarity.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{IndexEntry, ScoredChunk};

use super::{rank, VectorStore};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Arc<IndexEntry>>,
    dims: Option<usize>,
}

/// Process-lifetime store; contents vanish when it is dropped.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, entry: IndexEntry) -> Result<(), StoreError> {
        if entry.embedding.is_empty() {
            return Err(StoreError::EmptyEmbedding);
        }
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = inner.dims;
        match current {
            Some(expected) if expected != entry.embedding.len() => {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: entry.embedding.len(),
                });
            }
            Some(_) => {}
            None => inner.dims = Some(entry.embedding.len()),
        }
        inner.entries.insert(entry.entry_id.clone(), Arc::new(entry));
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let snapshot: Vec<Arc<IndexEntry>> = {
            let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
            if k == 0 || inner.entries.is_empty() {
                return Ok(Vec::new());
            }
            if let Some(expected) = inner.dims {
                if expected != vector.len() {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
            }
            inner.entries.values().cloned().collect()
        };

        let hits = snapshot
            .iter()
            .map(|e| ScoredChunk {
                entry_id: e.entry_id.clone(),
                text: e.text.clone(),
                score: cosine_similarity(vector, &e.embedding),
                metadata: e.metadata.clone(),
            })
            .collect();
        Ok(rank(hits, k))
    }

    async fn contains(&self, entry_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.entries.contains_key(entry_id))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.entries.clear();
        inner.dims = None;
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.entries.len())
    }
}
