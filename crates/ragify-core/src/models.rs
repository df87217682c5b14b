//! Core data models that flow through ingestion, retrieval, and chat.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An uploaded file and the text extracted from it.
///
/// The identifier is the SHA-256 of the raw bytes, so the same file
/// uploaded under a different name maps to the same document. The bytes
/// themselves stay on disk; only their hash and size are kept here.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Original filename or path, kept for citations.
    pub source: String,
    pub content_type: String,
    /// Size of the raw upload in bytes.
    pub size: usize,
    pub text: String,
}

impl Document {
    pub fn new(source: &str, content_type: &str, bytes: &[u8], text: String) -> Self {
        Self {
            id: content_id(bytes),
            source: source.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
            text,
        }
    }
}

/// Hex SHA-256 of a document's raw bytes.
pub fn content_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A contiguous span of a document's text.
///
/// `start` and `end` are character (not byte) offsets into the extracted
/// text; `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// SHA-256 of `text`.
    pub hash: String,
}

impl Chunk {
    /// Stable store key for this chunk. See [`entry_id`].
    pub fn entry_id(&self) -> String {
        entry_id(&self.document_id, self.chunk_index, &self.hash)
    }
}

/// Derive the deduplication key of a chunk.
///
/// SHA-256 over the document id, the chunk index, and the chunk's text hash.
/// Re-indexing the same bytes with the same chunking parameters yields the
/// same keys, which makes re-indexing a no-op.
pub fn entry_id(document_id: &str, chunk_index: usize, chunk_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update([0u8]);
    hasher.update((chunk_index as u64).to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Source metadata stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub document_id: String,
    pub source: String,
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    /// Embedding model that produced the vector.
    pub model: String,
    /// Unix timestamp (seconds) of the upsert.
    pub indexed_at: i64,
}

/// A (chunk text, embedding, metadata) triple persisted in a vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub entry_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Build the entry for `chunk` of `source`, stamped with the current time.
    pub fn from_chunk(chunk: &Chunk, source: &str, model: &str, embedding: Vec<f32>) -> Self {
        Self {
            entry_id: chunk.entry_id(),
            text: chunk.text.clone(),
            embedding,
            metadata: EntryMetadata {
                document_id: chunk.document_id.clone(),
                source: source.to_string(),
                chunk_index: chunk.chunk_index,
                start: chunk.start,
                end: chunk.end,
                model: model.to_string(),
                indexed_at: chrono::Utc::now().timestamp(),
            },
        }
    }
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub entry_id: String,
    pub text: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
    pub metadata: EntryMetadata,
}

/// Speaker of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
