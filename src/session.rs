//! Process-wide document session.
//!
//! A [`Session`] owns the embedder, the in-memory index and the retriever
//! for the lifetime of one `docqa` invocation. Documents are keyed by
//! file name (not full path), matching what a results filter refers to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use docqa_core::chunk::{chunk_document, document_fingerprint};
use docqa_core::embedding::Embedder;
use docqa_core::highlight::Highlighter;
use docqa_core::models::{DocumentFormat, ScoredResult};
use docqa_core::pipeline::{ingest_chunks, IngestReport};
use docqa_core::retrieve::{Query, Retriever};
use docqa_core::store::{InMemoryIndex, VectorIndex};
use docqa_core::Error;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::extract_document;

/// Result of ingesting one file.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Indexed(IngestReport),
    /// Same file name and same content as an earlier ingestion.
    Unchanged { filename: String },
}

impl IngestOutcome {
    pub fn filename(&self) -> &str {
        match self {
            IngestOutcome::Indexed(report) => &report.filename,
            IngestOutcome::Unchanged { filename } => filename,
        }
    }
}

/// A file that could not be ingested.
#[derive(Debug)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Aggregate over [`Session::ingest_inputs`].
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub outcomes: Vec<IngestOutcome>,
    pub failures: Vec<IngestFailure>,
}

impl IngestSummary {
    pub fn chunks_indexed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                IngestOutcome::Indexed(r) => r.indexed,
                IngestOutcome::Unchanged { .. } => 0,
            })
            .sum()
    }
}

pub struct Session {
    config: Config,
    embedder: Arc<dyn Embedder>,
    index: Arc<InMemoryIndex>,
    retriever: Retriever,
    /// file name -> fingerprint of the indexed chunks
    ingested: HashMap<String, String>,
}

impl Session {
    /// Create the configured embedder and an empty index.
    pub async fn new(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding).await?;
        Ok(Self::with_embedder(config, embedder))
    }

    pub fn with_embedder(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let index = Arc::new(InMemoryIndex::new(embedder.dims()));
        let highlighter = Highlighter::new(
            config.highlight.marker.clone(),
            config.highlight.matcher,
            config.highlight.min_term_chars,
        );
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            index.clone() as Arc<dyn VectorIndex>,
            highlighter,
        );
        Self {
            config,
            embedder,
            index,
            retriever,
            ingested: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read, extract and index one file.
    pub async fn ingest_path(&mut self, path: &Path) -> Result<IngestOutcome> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("not a file path: {}", path.display()))?;
        DocumentFormat::from_filename(&filename)?;

        let meta = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let max = self.config.ingest.max_file_bytes;
        if meta.len() > max {
            anyhow::bail!(
                "{} is {} bytes, larger than ingest.max_file_bytes ({})",
                path.display(),
                meta.len(),
                max
            );
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(self.ingest_bytes(&filename, &bytes).await?)
    }

    /// Extract and index a document already in memory.
    pub async fn ingest_bytes(&mut self, filename: &str, bytes: &[u8]) -> docqa_core::Result<IngestOutcome> {
        let document = extract_document(filename, bytes)?;
        let options = self.config.ingest_options();

        let chunks = chunk_document(&document, options.chunk_lines)?;
        let fingerprint = document_fingerprint(&chunks);
        if let Some(existing) = self.ingested.get(filename) {
            if *existing == fingerprint {
                info!(filename, "document already ingested, skipping");
                return Ok(IngestOutcome::Unchanged {
                    filename: filename.to_string(),
                });
            }
            return Err(Error::DuplicateDocument {
                filename: filename.to_string(),
            });
        }

        let report = ingest_chunks(
            filename,
            chunks,
            &options,
            self.embedder.as_ref(),
            self.index.as_ref(),
        )
        .await?;
        self.ingested
            .insert(report.filename.clone(), report.fingerprint.clone());
        Ok(IngestOutcome::Indexed(report))
    }

    /// Ingest files and directories. A failing document is recorded and
    /// the rest continue.
    pub async fn ingest_inputs(&mut self, inputs: &[PathBuf]) -> IngestSummary {
        self.ingest_files(expand_inputs(inputs)).await
    }

    /// Ingest files already expanded by [`expand_inputs`].
    pub async fn ingest_files(&mut self, files: Vec<PathBuf>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for path in files {
            match self.ingest_path(&path).await {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "document rejected");
                    summary.failures.push(IngestFailure { path, error });
                }
            }
        }
        summary
    }

    /// Answer one question. `top_k` and `highlight` fall back to the
    /// `[retrieval]` config.
    pub async fn query(
        &self,
        text: &str,
        filename: Option<&str>,
        top_k: Option<usize>,
        highlight: Option<bool>,
    ) -> docqa_core::Result<Vec<ScoredResult>> {
        let mut query = Query::new(text)
            .with_top_k(top_k.unwrap_or(self.config.retrieval.top_k))
            .with_highlight(highlight.unwrap_or(self.config.retrieval.highlight));
        if let Some(name) = filename {
            if !self.ingested.contains_key(name) {
                warn!(filename = name, "filter names a file that was not ingested");
            }
            query = query.with_filename(name);
        }
        self.retriever.query(&query).await
    }

    /// Ingested file names in first-insertion order.
    pub async fn filenames(&self) -> docqa_core::Result<Vec<String>> {
        self.index.filenames().await
    }

    pub async fn len(&self) -> docqa_core::Result<usize> {
        self.index.len().await
    }

    pub async fn is_empty(&self) -> docqa_core::Result<bool> {
        self.index.is_empty().await
    }

    /// Drop every document.
    pub async fn clear(&mut self) -> docqa_core::Result<()> {
        self.index.clear().await?;
        self.ingested.clear();
        Ok(())
    }
}

/// Explicit files are kept as given; directories are walked for
/// `.pdf`/`.docx` files in file-name order.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy();
            if DocumentFormat::from_filename(&name).is_ok() {
                files.push(entry.into_path());
            }
        }
    }
    files
}
