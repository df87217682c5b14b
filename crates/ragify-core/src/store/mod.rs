//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait holds [`IndexEntry`] triples keyed by a stable
//! entry id and answers nearest-neighbour queries by cosine similarity
//! (see [`crate::embedding::cosine_similarity`]).
//!
//! # Contract
//!
//! | Method | Behaviour |
//! |--------|-----------|
//! | [`upsert`](VectorStore::upsert) | Insert or overwrite by `entry_id`; never duplicates |
//! | [`query`](VectorStore::query) | At most `k` hits, descending score, ties by `entry_id`; empty store → empty result |
//! | [`contains`](VectorStore::contains) | Whether `entry_id` is present |
//! | [`clear`](VectorStore::clear) | Remove everything; the next upsert may set a new dimensionality |
//! | [`len`](VectorStore::len) | Number of entries |
//!
//! An entry is either fully present (text, vector, metadata) or absent.
//! The vector dimensionality is fixed by the first upsert after creation
//! or [`clear`](VectorStore::clear); a mismatching upsert or query fails with
//! [`StoreError::DimensionMismatch`].

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{IndexEntry, ScoredChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, entry: IndexEntry) -> Result<(), StoreError>;

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    async fn contains(&self, entry_id: &str) -> Result<bool, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

/// Sort hits best-first (ties broken by entry id) and keep the top `k`.
pub fn rank(mut hits: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    hits.truncate(k);
    hits
}
