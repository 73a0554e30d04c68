//! In-memory [`VectorIndex`] implementation.
//!
//! Entries live in a `Vec` behind a `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every candidate that passes the
//! filter, which is plenty for a personal corpus of a few thousand chunks.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Chunk, IndexEntry};

use super::{ScoredEntry, SearchFilter, VectorIndex};

struct Entries {
    items: Vec<IndexEntry>,
    next_seq: u64,
}

/// Process-lifetime vector collection.
pub struct InMemoryIndex {
    dims: usize,
    entries: RwLock<Entries>,
}

impl InMemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: RwLock::new(Entries {
                items: Vec::new(),
                next_seq: 0,
            }),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<()> {
        if let Some((_, v)) = entries.iter().find(|(_, v)| v.len() != self.dims) {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: v.len(),
            });
        }

        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.items.reserve(entries.len());
        for (chunk, vector) in entries {
            let seq = guard.next_seq;
            guard.next_seq += 1;
            guard.items.push(IndexEntry { seq, chunk, vector });
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        if query_vector.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: query_vector.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(usize, f32)> = guard
            .items
            .iter()
            .enumerate()
            .filter(|(_, e)| filter.map_or(true, |f| f.matches(e)))
            .map(|(i, e)| (i, cosine_similarity(query_vector, &e.vector)))
            .collect();

        // stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredEntry {
                entry: guard.items[i].clone(),
                score,
            })
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.items.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.items.len())
    }

    async fn filenames(&self) -> Result<Vec<String>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = Vec::new();
        for entry in &guard.items {
            if !names.iter().any(|n| n == &entry.chunk.filename) {
                names.push(entry.chunk.filename.clone());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineRange;

    fn chunk(filename: &str, chunk_id: usize) -> Chunk {
        Chunk {
            filename: filename.to_string(),
            page: None,
            chunk_id,
            line_range: LineRange {
                start: chunk_id * 20 + 1,
                end: chunk_id * 20 + 20,
            },
            text: format!("{filename} chunk {chunk_id}"),
            hash: String::new(),
        }
    }

    async fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new(2);
        index
            .upsert(vec![
                (chunk("a.pdf", 0), vec![1.0, 0.0]),
                (chunk("b.docx", 0), vec![0.8, 0.6]),
                (chunk("a.pdf", 1), vec![0.0, 1.0]),
                (chunk("b.docx", 1), vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let index = InMemoryIndex::new(2);
        let hits = index.search(&[1.0, 0.0], 3, None).await.unwrap();
        assert!(hits.is_empty());
        assert!(index.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let index = seeded().await;
        let hits = index.search(&[1.0, 0.0], 3, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        let ids: Vec<(&str, usize)> = hits
            .iter()
            .map(|h| (h.entry.chunk.filename.as_str(), h.entry.chunk.chunk_id))
            .collect();
        assert_eq!(ids, vec![("a.pdf", 0), ("b.docx", 0), ("a.pdf", 1)]);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_filter_applies_before_ranking() {
        let index = seeded().await;
        let filter = SearchFilter::filename("b.docx");
        let hits = index.search(&[1.0, 0.0], 3, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.entry.chunk.filename == "b.docx"));
        assert_eq!(hits[1].entry.chunk.chunk_id, 1);
        assert!((hits[1].score + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_non_finite_vector_ranks_as_unrelated() {
        let index = InMemoryIndex::new(2);
        index
            .upsert(vec![
                (chunk("a.pdf", 0), vec![f32::NAN, 0.0]),
                (chunk("a.pdf", 1), vec![0.6, 0.8]),
                (chunk("a.pdf", 2), vec![-0.6, -0.8]),
            ])
            .await
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.entry.chunk.chunk_id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
        assert_eq!(hits[1].score, 0.0);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_filter_with_unknown_file_is_empty() {
        let index = seeded().await;
        let filter = SearchFilter::filename("missing.pdf");
        let hits = index.search(&[1.0, 0.0], 3, Some(&filter)).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = InMemoryIndex::new(2);
        index
            .upsert(vec![
                (chunk("a.pdf", 0), vec![0.0, 1.0]),
                (chunk("a.pdf", 1), vec![1.0, 0.0]),
                (chunk("a.pdf", 2), vec![2.0, 0.0]),
                (chunk("a.pdf", 3), vec![3.0, 0.0]),
            ])
            .await
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 4, None).await.unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.entry.chunk.chunk_id).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
        let seqs: Vec<u64> = hits.iter().map(|h| h.entry.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_stores_nothing() {
        let index = InMemoryIndex::new(2);
        let err = index
            .upsert(vec![
                (chunk("a.pdf", 0), vec![1.0, 0.0]),
                (chunk("a.pdf", 1), vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(index.len().await.unwrap(), 0);

        let err = index.search(&[1.0], 3, None).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_upsert_appends_duplicates() {
        let index = InMemoryIndex::new(2);
        for _ in 0..2 {
            index
                .upsert(vec![(chunk("a.pdf", 0), vec![1.0, 0.0])])
                .await
                .unwrap();
        }
        assert_eq!(index.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_and_filenames() {
        let index = seeded().await;
        assert_eq!(index.filenames().await.unwrap(), vec!["a.pdf", "b.docx"]);
        index.clear().await.unwrap();
        assert_eq!(index.len().await.unwrap(), 0);
        assert!(index.filenames().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_does_not_mutate() {
        let index = seeded().await;
        let before = index.len().await.unwrap();
        let _ = index.search(&[0.0, 1.0], 10, None).await.unwrap();
        assert_eq!(index.len().await.unwrap(), before);
    }
}
