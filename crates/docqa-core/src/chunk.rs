//! Fixed-size line chunker.
//!
//! Splits a [`Document`]'s line sequence into [`Chunk`]s of exactly
//! `chunk_lines` consecutive lines; only the final chunk may be shorter.
//! Windows never overlap and together cover every line exactly once.
//!
//! Each chunk receives its zero-based window index as `chunk_id`, the
//! 1-based inclusive line range it spans, the page of its first line (for
//! paged formats) and a SHA-256 hash of its text. Hashes make chunk
//! boundaries checkable: re-chunking the same document with the same
//! window size yields byte-identical chunks and the same
//! [`document_fingerprint`].
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::chunk_document;
//! use docqa_core::models::{Document, DocumentFormat};
//!
//! let lines = (1..=45).map(|i| format!("line {i}")).collect();
//! let doc = Document::unpaged("notes.docx", DocumentFormat::Docx, lines);
//! let chunks = chunk_document(&doc, 20).unwrap();
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[2].line_range.start, 41);
//! assert_eq!(chunks[2].line_range.end, 45);
//! ```

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::models::{Chunk, Document, LineRange};

/// Window size used when configuration does not override it.
pub const DEFAULT_CHUNK_LINES: usize = 20;

/// Partition `document` into consecutive windows of `chunk_lines` lines.
///
/// An empty document yields no chunks. `chunk_lines` must be at least 1.
pub fn chunk_document(document: &Document, chunk_lines: usize) -> Result<Vec<Chunk>> {
    if chunk_lines == 0 {
        return Err(Error::InvalidArgument(
            "chunk_lines must be >= 1".to_string(),
        ));
    }

    let chunks = document
        .lines()
        .chunks(chunk_lines)
        .enumerate()
        .map(|(chunk_id, window)| {
            let first = chunk_id * chunk_lines;
            let text = window.join("\n");
            Chunk {
                filename: document.filename().to_string(),
                page: document.page_of(first),
                chunk_id,
                line_range: LineRange {
                    start: first + 1,
                    end: first + window.len(),
                },
                hash: content_hash(&text),
                text,
            }
        })
        .collect();

    Ok(chunks)
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash over the ordered chunk hashes of one document.
///
/// Two ingestions of the same file with the same window size produce the
/// same fingerprint.
pub fn document_fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.hash.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentFormat;

    fn numbered(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    fn docx(n: usize) -> Document {
        Document::unpaged("notes.docx", DocumentFormat::Docx, numbered(n))
    }

    #[test]
    fn test_forty_five_lines_three_chunks() {
        let chunks = chunk_document(&docx(45), 20).unwrap();
        let ranges: Vec<(usize, usize)> = chunks
            .iter()
            .map(|c| (c.line_range.start, c.line_range.end))
            .collect();
        assert_eq!(ranges, vec![(1, 20), (21, 40), (41, 45)]);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_id, i);
            assert_eq!(c.filename, "notes.docx");
            assert_eq!(c.page, None);
        }
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunks = chunk_document(&docx(7), 20).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_range, LineRange { start: 1, end: 7 });
        assert_eq!(chunks[0].text.lines().count(), 7);
    }

    #[test]
    fn test_empty_document_no_chunks() {
        let chunks = chunk_document(&docx(0), 20).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = chunk_document(&docx(3), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_exact_multiple_has_no_short_tail() {
        let chunks = chunk_document(&docx(40), 20).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].line_range, LineRange { start: 21, end: 40 });
    }

    #[test]
    fn test_concatenation_reproduces_lines() {
        let mut lines = numbered(53);
        lines[4] = String::new();
        lines[19] = "   ".to_string();
        let doc = Document::unpaged("a.docx", DocumentFormat::Docx, lines.clone());
        for size in [1, 2, 3, 7, 20, 52, 53, 54, 100] {
            let chunks = chunk_document(&doc, size).unwrap();
            let rebuilt: Vec<String> = chunks
                .iter()
                .flat_map(|c| c.text.split('\n').map(str::to_string))
                .collect();
            assert_eq!(rebuilt, lines, "window size {size}");

            let mut next = 1;
            for c in &chunks {
                assert_eq!(c.line_range.start, next);
                next = c.line_range.end + 1;
            }
            assert_eq!(next, lines.len() + 1);
        }
    }

    #[test]
    fn test_page_taken_from_first_line() {
        let doc = Document::paged(
            "report.pdf",
            DocumentFormat::Pdf,
            vec![numbered(15), numbered(15), numbered(15)],
        );
        let chunks = chunk_document(&doc, 20).unwrap();
        let pages: Vec<Option<u32>> = chunks.iter().map(|c| c.page).collect();
        // windows start at lines 1, 21 and 41
        assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_deterministic() {
        let doc = docx(33);
        let a = chunk_document(&doc, 10).unwrap();
        let b = chunk_document(&doc, 10).unwrap();
        assert_eq!(a, b);
        assert_eq!(document_fingerprint(&a), document_fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_tracks_content_and_window() {
        let a = chunk_document(&docx(33), 10).unwrap();
        let b = chunk_document(&docx(34), 10).unwrap();
        let c = chunk_document(&docx(33), 11).unwrap();
        assert_ne!(document_fingerprint(&a), document_fingerprint(&b));
        assert_ne!(document_fingerprint(&a), document_fingerprint(&c));
    }

    #[test]
    fn test_hash_matches_text() {
        let chunks = chunk_document(&docx(3), 20).unwrap();
        assert_eq!(chunks[0].hash, content_hash("line 1\nline 2\nline 3"));
        assert_eq!(chunks[0].hash.len(), 64);
    }
}
