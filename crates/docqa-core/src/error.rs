//! Error taxonomy shared by the ingest and query paths.
//!
//! Every variant carries enough context (filename, chunk index, expected
//! dimension) to produce a readable message without the caller having to
//! re-attach it. Searching an empty index is not an error and has no
//! variant here.

use thiserror::Error;

/// Failures raised by an [`Embedder`](crate::embedding::Embedder).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Input text at `index` of the batch was empty or whitespace only.
    #[error("text at position {index} is empty")]
    EmptyText { index: usize },

    /// The model could not be loaded. Surfaced once, at startup.
    #[error("failed to initialize embedding model: {0}")]
    Init(String),

    /// The model failed while embedding a batch.
    #[error("embedding model failed: {0}")]
    Model(String),

    /// The model returned a vector of unexpected length.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported format for '{filename}': only .pdf and .docx are accepted")]
    UnsupportedFormat { filename: String },

    #[error("failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("invalid query: {0}")]
    Query(String),

    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("'{filename}' was already ingested with different content; clear the index first")]
    DuplicateDocument { filename: String },
}

pub type Result<T> = std::result::Result<T, Error>;
