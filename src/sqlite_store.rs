//! SQLite-backed [`VectorStore`].
//!
//! One row per entry in the `entries` table, with the vector stored as a
//! little-endian f32 BLOB. Queries load every vector and rank them by
//! cosine similarity in Rust, which is adequate for the few thousand chunks
//! a handful of uploaded manuals produce.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ragify_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use ragify_core::error::StoreError;
use ragify_core::models::{EntryMetadata, IndexEntry, ScoredChunk};
use ragify_core::store::{rank, VectorStore};

use crate::{db, migrate};

/// Per-document row counts reported by `ragify stats`.
#[derive(Debug, Clone)]
pub struct SourceCount {
    pub source: String,
    pub document_id: String,
    pub entries: i64,
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `path` and make sure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn stored_dims(&self) -> Result<Option<usize>, StoreError> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM entries LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(dims.map(|d| d as usize))
    }

    pub async fn sources(&self) -> Result<Vec<SourceCount>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT source, document_id, COUNT(*) AS entries
            FROM entries
            GROUP BY document_id, source
            ORDER BY source
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows
            .iter()
            .map(|row| SourceCount {
                source: row.get("source"),
                document_id: row.get("document_id"),
                entries: row.get("entries"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, entry: IndexEntry) -> Result<(), StoreError> {
        let dims = entry.embedding.len();
        if dims == 0 {
            return Err(StoreError::EmptyEmbedding);
        }

        // The NOT EXISTS guard makes the dimensionality check and the write
        // one statement, so concurrent writers cannot mix vector sizes.
        let result = sqlx::query(
            r#"
            INSERT INTO entries (entry_id, document_id, source, chunk_index, start_offset,
                                 end_offset, text, embedding, dims, model, indexed_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM entries WHERE dims != ?)
            ON CONFLICT(entry_id) DO UPDATE SET
                document_id = excluded.document_id,
                source = excluded.source,
                chunk_index = excluded.chunk_index,
                start_offset = excluded.start_offset,
                end_offset = excluded.end_offset,
                text = excluded.text,
                embedding = excluded.embedding,
                dims = excluded.dims,
                model = excluded.model,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(&entry.entry_id)
        .bind(&entry.metadata.document_id)
        .bind(&entry.metadata.source)
        .bind(entry.metadata.chunk_index as i64)
        .bind(entry.metadata.start as i64)
        .bind(entry.metadata.end as i64)
        .bind(&entry.text)
        .bind(vec_to_blob(&entry.embedding))
        .bind(dims as i64)
        .bind(&entry.metadata.model)
        .bind(entry.metadata.indexed_at)
        .bind(dims as i64)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let expected = self.stored_dims().await?.unwrap_or(dims);
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: dims,
            });
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        match self.stored_dims().await? {
            None => return Ok(Vec::new()),
            Some(expected) if expected != vector.len() => {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        let rows = sqlx::query(
            r#"
            SELECT entry_id, document_id, source, chunk_index, start_offset, end_offset,
                   text, embedding, model, indexed_at
            FROM entries
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let chunk_index: i64 = row.get("chunk_index");
                let start: i64 = row.get("start_offset");
                let end: i64 = row.get("end_offset");
                ScoredChunk {
                    entry_id: row.get("entry_id"),
                    text: row.get("text"),
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    metadata: EntryMetadata {
                        document_id: row.get("document_id"),
                        source: row.get("source"),
                        chunk_index: chunk_index as usize,
                        start: start as usize,
                        end: end as usize,
                        model: row.get("model"),
                        indexed_at: row.get("indexed_at"),
                    },
                }
            })
            .collect();

        Ok(rank(hits, k))
    }

    async fn contains(&self, entry_id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM entries WHERE entry_id = ?")
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(found.is_some())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        sqlx::query("DELETE FROM entries")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, source: &str, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            entry_id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: EntryMetadata {
                document_id: format!("doc-{}", source),
                source: source.to_string(),
                chunk_index: 3,
                start: 10,
                end: 10 + text.chars().count(),
                model: "test-model".to_string(),
                indexed_at: 1_700_000_000,
            },
        }
    }

    async fn open_temp() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("data").join("ragify.sqlite"))
            .await
            .unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_upsert_query_preserves_metadata() {
        let (_tmp, store) = open_temp().await;
        store
            .upsert(entry("a", "manual.pdf", "warranty text", vec![0.0, 1.0]))
            .await
            .unwrap();

        let hits = store.query(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "warranty text");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[0].metadata.source, "manual.pdf");
        assert_eq!(hits[0].metadata.chunk_index, 3);
        assert_eq!(hits[0].metadata.start, 10);
        assert_eq!(hits[0].metadata.end, 23);
        assert_eq!(hits[0].metadata.indexed_at, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (_tmp, store) = open_temp().await;
        for _ in 0..3 {
            store
                .upsert(entry("a", "m.pdf", "same", vec![1.0, 0.0]))
                .await
                .unwrap();
        }
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.contains("a").await.unwrap());
        assert!(!store.contains("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_ranking_and_top_k() {
        let (_tmp, store) = open_temp().await;
        store.upsert(entry("a", "m.pdf", "x", vec![1.0, 0.0])).await.unwrap();
        store.upsert(entry("b", "m.pdf", "y", vec![0.0, 1.0])).await.unwrap();
        store.upsert(entry("c", "m.pdf", "z", vec![0.8, 0.6])).await.unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.query(&[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let (_tmp, store) = open_temp().await;
        store.upsert(entry("a", "m.pdf", "x", vec![1.0, 0.0])).await.unwrap();

        let err = store
            .upsert(entry("b", "m.pdf", "y", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(!store.contains("b").await.unwrap());

        let err = store.query(&[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_clear_empties_and_resets_dims() {
        let (_tmp, store) = open_temp().await;
        store.upsert(entry("a", "m.pdf", "x", vec![1.0, 0.0])).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.query(&[1.0, 0.0], 4).await.unwrap().is_empty());

        store
            .upsert(entry("b", "m.pdf", "y", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ragify.sqlite");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.upsert(entry("a", "m.pdf", "x", vec![1.0, 0.0])).await.unwrap();
            store.close().await;
        }
        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sources_groups_by_document() {
        let (_tmp, store) = open_temp().await;
        store.upsert(entry("a", "a.pdf", "x", vec![1.0, 0.0])).await.unwrap();
        store.upsert(entry("b", "a.pdf", "y", vec![1.0, 0.0])).await.unwrap();
        store.upsert(entry("c", "b.pdf", "z", vec![1.0, 0.0])).await.unwrap();

        let sources = store.sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "a.pdf");
        assert_eq!(sources[0].entries, 2);
        assert_eq!(sources[1].entries, 1);
    }
}
