//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage operations the ingest
//! and query paths need, so the in-memory collection can later be
//! replaced by a persistent backend without touching retrieval logic.
//!
//! Implementations must be `Send + Sync`. Writers (`upsert`, `clear`)
//! need exclusive access; readers (`search`, `len`, `filenames`) may run
//! concurrently with each other but never alongside a writer.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, IndexEntry};

pub use memory::InMemoryIndex;

/// Equality filters applied to candidates before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Only consider entries whose chunk came from this file.
    pub filename: Option<String>,
}

impl SearchFilter {
    pub fn filename(name: impl Into<String>) -> Self {
        Self {
            filename: Some(name.into()),
        }
    }

    pub fn matches(&self, entry: &IndexEntry) -> bool {
        self.filename
            .as_deref()
            .map_or(true, |name| entry.chunk.filename == name)
    }
}

/// A stored entry with its similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub score: f32,
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Append (chunk, vector) entries |
/// | [`search`](VectorIndex::search) | Filter, then rank by cosine similarity |
/// | [`clear`](VectorIndex::clear) | Drop every entry |
/// | [`len`](VectorIndex::len) | Number of stored entries |
/// | [`filenames`](VectorIndex::filenames) | Distinct filenames, first-insertion order |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Vector dimension every entry must have.
    fn dims(&self) -> usize;

    /// Append entries. No uniqueness is enforced.
    ///
    /// Fails with [`Error::DimensionMismatch`](crate::Error::DimensionMismatch)
    /// if any vector has the wrong length, in which case nothing from
    /// this call is stored.
    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<()>;

    /// Return at most `top_k` entries by descending cosine similarity.
    ///
    /// `filter` restricts the candidate set before ranking, so a narrow
    /// filter can return fewer than `top_k` results. Equal scores keep
    /// insertion order. An empty index yields an empty vector.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Distinct filenames of stored entries, in first-insertion order.
    async fn filenames(&self) -> Result<Vec<String>>;
}
