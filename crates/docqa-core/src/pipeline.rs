//! Ingestion pipeline: chunk → embed → index.
//!
//! [`ingest_document`] turns one extracted [`Document`] into index
//! entries. Embedding runs in batches of `batch_size`; the entries are
//! written to the index only after the whole document has been embedded,
//! so a document that aborts leaves nothing behind.
//!
//! # Embedding failures
//!
//! | Policy | Blank chunk | Failing batch |
//! |--------|-------------|---------------|
//! | [`EmbeddingPolicy::Skip`] | skipped, warned | chunks retried one by one, failures skipped |
//! | [`EmbeddingPolicy::Abort`] | document aborted | document aborted |
//!
//! Every skip is logged with `tracing::warn!` and listed in
//! [`IngestReport::skipped`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunk::{chunk_document, document_fingerprint, DEFAULT_CHUNK_LINES};
use crate::embedding::{check_dims, Embedder};
use crate::error::{EmbeddingError, Error, Result};
use crate::models::{Chunk, Document, LineRange};
use crate::store::VectorIndex;

/// What to do when a chunk cannot be embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingPolicy {
    /// Skip the offending chunk and keep going.
    #[default]
    Skip,
    /// Abort the whole document.
    Abort,
}

/// Tuning for [`ingest_document`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_lines: usize,
    pub batch_size: usize,
    pub policy: EmbeddingPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_lines: DEFAULT_CHUNK_LINES,
            batch_size: 64,
            policy: EmbeddingPolicy::Skip,
        }
    }
}

/// A chunk left out of the index.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedChunk {
    pub chunk_id: usize,
    pub line_range: LineRange,
    pub reason: String,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub filename: String,
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Chunks written to the index.
    pub indexed: usize,
    pub skipped: Vec<SkippedChunk>,
    /// See [`document_fingerprint`].
    pub fingerprint: String,
}

impl IngestReport {
    /// True when some chunks were skipped.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Chunk, embed and index one document.
pub async fn ingest_document(
    document: &Document,
    options: &IngestOptions,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> Result<IngestReport> {
    let chunks = chunk_document(document, options.chunk_lines)?;
    debug!(filename = document.filename(), chunks = chunks.len(), "chunked document");
    ingest_chunks(document.filename(), chunks, options, embedder, index).await
}

/// Embed and index chunks already produced by [`chunk_document`].
///
/// `options.chunk_lines` is not consulted.
pub async fn ingest_chunks(
    filename: &str,
    chunks: Vec<Chunk>,
    options: &IngestOptions,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> Result<IngestReport> {
    if options.batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be >= 1".to_string()));
    }

    let fingerprint = document_fingerprint(&chunks);
    let total = chunks.len();

    let mut skipped = Vec::new();
    let mut pending: Vec<Chunk> = Vec::with_capacity(total);
    for chunk in chunks {
        if chunk.text.trim().is_empty() {
            let err = EmbeddingError::EmptyText {
                index: chunk.chunk_id,
            };
            handle_failure(filename, &chunk, err, options.policy, &mut skipped)?;
            continue;
        }
        pending.push(chunk);
    }

    let mut embedded: Vec<(Chunk, Vec<f32>)> = Vec::with_capacity(pending.len());
    for batch in pending.chunks(options.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        match embed_checked(embedder, &texts).await {
            Ok(vectors) => embedded.extend(batch.iter().cloned().zip(vectors)),
            Err(err) if options.policy == EmbeddingPolicy::Abort => {
                warn!(filename, error = %err, "embedding failed, aborting document");
                return Err(err.into());
            }
            Err(err) => {
                warn!(
                    filename,
                    error = %err,
                    batch = batch.len(),
                    "embedding batch failed, isolating chunks"
                );
                for chunk in batch {
                    match embed_checked(embedder, std::slice::from_ref(&chunk.text)).await {
                        Ok(mut vectors) => {
                            if let Some(v) = vectors.pop() {
                                embedded.push((chunk.clone(), v));
                            }
                        }
                        Err(err) => {
                            handle_failure(filename, chunk, err, options.policy, &mut skipped)?
                        }
                    }
                }
            }
        }
    }

    let indexed = embedded.len();
    if !embedded.is_empty() {
        index.upsert(embedded).await?;
    }

    let report = IngestReport {
        filename: filename.to_string(),
        chunks: total,
        indexed,
        skipped,
        fingerprint,
    };
    if report.is_partial() {
        warn!(
            filename,
            indexed,
            skipped = report.skipped.len(),
            "partial ingestion: some chunks were not indexed"
        );
    } else {
        info!(filename, indexed, "document ingested");
    }
    Ok(report)
}

async fn embed_checked(
    embedder: &dyn Embedder,
    texts: &[String],
) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
    let vectors = embedder.embed_batch(texts).await?;
    check_dims(&vectors, texts.len(), embedder.dims())?;
    Ok(vectors)
}

fn handle_failure(
    filename: &str,
    chunk: &Chunk,
    err: EmbeddingError,
    policy: EmbeddingPolicy,
    skipped: &mut Vec<SkippedChunk>,
) -> Result<()> {
    match policy {
        EmbeddingPolicy::Abort => Err(err.into()),
        EmbeddingPolicy::Skip => {
            warn!(
                filename,
                chunk_id = chunk.chunk_id,
                lines = %chunk.line_range,
                error = %err,
                "skipping chunk"
            );
            skipped.push(SkippedChunk {
                chunk_id: chunk.chunk_id,
                line_range: chunk.line_range,
                reason: err.to_string(),
            });
            Ok(())
        }
    }
}
