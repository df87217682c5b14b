//! Indexing pipeline: extract → chunk → skip known → embed → upsert.
//!
//! Ingestion is at-least-once and non-atomic. Chunks are embedded in
//! batches of `embedding.batch_size` and upserted one entry at a time, so if
//! a batch fails the entries written before it stay in the store and the
//! error carries how many that was. Re-running the same document picks up
//! where it stopped because committed chunks are skipped by entry id.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use ragify_core::chunk::{chunk_text, ChunkParams};
use ragify_core::embedding::{check_batch, Embedder};
use ragify_core::models::{content_id, Chunk, Document, IndexEntry};
use ragify_core::store::VectorStore;

use crate::error::IndexError;
use crate::extract::{content_type_for_path, extract_text, ExtractionError};

/// Outcome of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub document_id: String,
    pub source: String,
    /// Non-blank chunks the document produced.
    pub chunks: usize,
    /// Chunks embedded and written by this call.
    pub indexed: usize,
    /// Chunks already present in the store.
    pub skipped: usize,
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    params: ChunkParams,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        params: ChunkParams,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            params,
            batch_size: batch_size.max(1),
        }
    }

    /// Index the file at `path`; the content type comes from its extension.
    pub async fn index_path(&self, path: &Path) -> Result<IndexReport, IndexError> {
        let content_type = content_type_for_path(path).ok_or_else(|| {
            ExtractionError::UnsupportedContentType(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.index_bytes(&source, content_type, bytes).await
    }

    /// Index an in-memory document. Extraction failures abort before the
    /// store is touched.
    pub async fn index_bytes(
        &self,
        source: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<IndexReport, IndexError> {
        let id = content_id(&bytes);
        let size = bytes.len();
        let text = extract_text(bytes, content_type).await?;
        let document = Document {
            id,
            source: source.to_string(),
            content_type: content_type.to_string(),
            size,
            text,
        };
        self.index_document(&document).await
    }

    pub async fn index_document(&self, document: &Document) -> Result<IndexReport, IndexError> {
        let chunks: Vec<Chunk> = chunk_text(&document.id, &document.text, &self.params)
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        let mut pending = Vec::new();
        let mut skipped = 0;
        for chunk in &chunks {
            let present = self
                .store
                .contains(&chunk.entry_id())
                .await
                .map_err(|source| IndexError::Store { indexed: 0, source })?;
            if present {
                skipped += 1;
            } else {
                pending.push(chunk);
            }
        }

        let mut indexed = 0;
        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            tracing::debug!(
                source = %document.source,
                batch = texts.len(),
                "embedding chunk batch"
            );

            let embedded = self
                .embedder
                .embed_batch(&texts)
                .await
                .and_then(|vectors| {
                    check_batch(&vectors, texts.len(), self.embedder.dims())?;
                    Ok(vectors)
                });
            let vectors = match embedded {
                Ok(vectors) => vectors,
                Err(source) => {
                    tracing::warn!(
                        source_file = %document.source,
                        indexed,
                        error = %source,
                        "indexing stopped partway"
                    );
                    return Err(IndexError::Embedding { indexed, source });
                }
            };

            for (chunk, vector) in batch.iter().zip(vectors) {
                let entry =
                    IndexEntry::from_chunk(chunk, &document.source, self.embedder.model_name(), vector);
                self.store
                    .upsert(entry)
                    .await
                    .map_err(|source| IndexError::Store { indexed, source })?;
                indexed += 1;
            }
        }

        tracing::info!(
            source = %document.source,
            document_id = %document.id,
            chunks = chunks.len(),
            indexed,
            skipped,
            "indexed document"
        );

        Ok(IndexReport {
            document_id: document.id.clone(),
            source: document.source.clone(),
            chunks: chunks.len(),
            indexed,
            skipped,
        })
    }
}
