//! Ranked retrieval over a [`VectorIndex`].
//!
//! The [`Retriever`] embeds the query text with the shared [`Embedder`],
//! searches the index with the requested `top_k` and filename filter, and
//! wraps each hit as a [`ScoredResult`], highlighted on request.
//!
//! Scores are raw cosine similarities. No threshold is applied: all
//! `top_k` hits are returned and relevance judgement is left to the
//! caller.

use std::sync::Arc;

use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::highlight::Highlighter;
use crate::models::ScoredResult;
use crate::store::{SearchFilter, VectorIndex};

/// Number of results returned when the caller does not ask for more.
pub const DEFAULT_TOP_K: usize = 3;

/// A single question against the index.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub filename_filter: Option<String>,
    pub top_k: usize,
    pub highlight: bool,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename_filter: None,
            top_k: DEFAULT_TOP_K,
            highlight: true,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename_filter = Some(filename.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Reject input that must never reach the embedder.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::Query("query text is empty".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Query("top_k must be a positive integer".to_string()));
        }
        Ok(())
    }
}

/// Query-side orchestrator. Cheap to clone; shares the embedder and index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    highlighter: Highlighter,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, highlighter: Highlighter) -> Self {
        Self {
            embedder,
            index,
            highlighter,
        }
    }

    /// Return up to `query.top_k` results, best first.
    pub async fn query(&self, query: &Query) -> Result<Vec<ScoredResult>> {
        query.validate()?;
        debug!(
            query = %query.text,
            top_k = query.top_k,
            filter = query.filename_filter.as_deref(),
            "running query"
        );

        let query_vector = self.embedder.embed(&query.text).await?;
        let filter = query.filename_filter.clone().map(SearchFilter::filename);
        let hits = self
            .index
            .search(&query_vector, query.top_k, filter.as_ref())
            .await?;
        info!(hits = hits.len(), "query answered");

        let matcher = if query.highlight {
            self.highlighter.matcher_for(&query.text)
        } else {
            None
        };

        Ok(hits
            .into_iter()
            .map(|hit| {
                let highlighted = query.highlight.then(|| match &matcher {
                    Some(m) => self.highlighter.highlight_with(&hit.entry.chunk.text, m.as_ref()),
                    None => hit.entry.chunk.text.clone(),
                });
                ScoredResult::new(hit.entry.chunk, hit.score, highlighted)
            })
            .collect())
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("model", &self.embedder.model_name())
            .field("dims", &self.embedder.dims())
            .field("highlighter", &self.highlighter)
            .finish()
    }
}
