//! # docqa core
//!
//! I/O-free logic for docqa: the document and chunk model, the fixed-size
//! line chunker, the [`Embedder`](embedding::Embedder) and
//! [`VectorIndex`](store::VectorIndex) traits, the ingestion pipeline,
//! ranked retrieval and match highlighting.
//!
//! Text extraction, concrete model backends, configuration files and the
//! CLI live in the `docqa` application crate.
//!
//! ```text
//! Document ─▶ chunk ─▶ Embedder ─▶ VectorIndex      (ingest)
//! Query ─▶ Embedder ─▶ VectorIndex::search ─▶ Retriever ─▶ Highlighter
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod highlight;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod store;

pub use error::{EmbeddingError, Error, Result};
