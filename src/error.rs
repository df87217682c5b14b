//! Errors of the composite operations (indexing, answering, uploading).
//!
//! Capability errors come from `ragify_core::error`; these types say which
//! step of a pipeline failed and, for indexing, how far it got.

use thiserror::Error;

use ragify_core::error::{EmbeddingError, GenerationError, StoreError};

use crate::extract::ExtractionError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Entries written before the failure stay in the store.
    #[error("embedding failed after {indexed} chunks were indexed: {source}")]
    Embedding {
        indexed: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("store write failed after {indexed} chunks were indexed: {source}")]
    Store {
        indexed: usize,
        #[source]
        source: StoreError,
    },
}

impl IndexError {
    /// Chunks that were committed before the failure.
    pub fn indexed(&self) -> usize {
        match self {
            IndexError::Extraction(_) => 0,
            IndexError::Embedding { indexed, .. } | IndexError::Store { indexed, .. } => *indexed,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("could not embed the question: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("could not search the index: {0}")]
    Store(#[from] StoreError),

    #[error("could not generate an answer: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file name: {0:?}")]
    InvalidFilename(String),

    #[error("only PDF uploads are accepted, got {0:?}")]
    UnsupportedType(String),

    #[error("upload is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("could not save upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Saving an upload and indexing it, as one user action.
#[derive(Debug, Error)]
pub enum UploadFlowError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
