//! Error taxonomy shared by the pipeline.
//!
//! Each external capability has its own error type so callers can tell an
//! unreachable embedding service apart from a failing language model or a
//! broken store. Extraction errors live with the extractor in the app crate.

use std::time::Duration;

use thiserror::Error;

/// Failure while turning text into vectors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("{env_var} environment variable not set")]
    MissingApiKey { env_var: String },

    #[error("embedding service unreachable: {0}")]
    Unreachable(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("expected {expected}-dimensional embeddings, got {actual}")]
    Dimensions { expected: usize, actual: usize },

    #[error("local embedding model failed: {0}")]
    Model(String),
}

/// Failure while producing an answer from the language model.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("language model provider is disabled")]
    Disabled,

    #[error("{env_var} environment variable not set")]
    MissingApiKey { env_var: String },

    #[error("language model unreachable: {0}")]
    Unreachable(String),

    #[error("language model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("language model API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("language model returned an empty answer")]
    EmptyResponse,
}

/// Failure inside a [`VectorStore`](crate::store::VectorStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("refusing to store an entry without an embedding")]
    EmptyEmbedding,

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Wrap any backend error (SQL driver, I/O) by its message.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Invalid chunk size / overlap combination.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("chunk_size ({chunk_size}) must be greater than overlap ({overlap})")]
pub struct ChunkParamsError {
    pub chunk_size: usize,
    pub overlap: usize,
}
