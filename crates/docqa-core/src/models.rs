//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, index entries and scored
//! results that flow through the ingestion and retrieval pipeline.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Source formats accepted for ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolve the format from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("docx") => Ok(Self::Docx),
            _ => Err(Error::UnsupportedFormat {
                filename: filename.to_string(),
            }),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Docx => f.write_str("docx"),
        }
    }
}

/// An extracted document: an ordered, immutable sequence of lines.
///
/// Paged documents also record the zero-based index of the first line of
/// every page, so any line can be mapped back to its page.
#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    format: DocumentFormat,
    lines: Vec<String>,
    page_starts: Option<Vec<usize>>,
}

impl Document {
    /// Build a paged document from per-page line lists (page 1 first).
    pub fn paged(filename: impl Into<String>, format: DocumentFormat, pages: Vec<Vec<String>>) -> Self {
        let mut lines = Vec::new();
        let mut page_starts = Vec::with_capacity(pages.len());
        for page in pages {
            page_starts.push(lines.len());
            lines.extend(page);
        }
        Self {
            filename: filename.into(),
            format,
            lines,
            page_starts: Some(page_starts),
        }
    }

    /// Build a document without page structure.
    pub fn unpaged(filename: impl Into<String>, format: DocumentFormat, lines: Vec<String>) -> Self {
        Self {
            filename: filename.into(),
            format,
            lines,
            page_starts: None,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of pages, or `None` for unpaged documents.
    pub fn page_count(&self) -> Option<usize> {
        self.page_starts.as_ref().map(Vec::len)
    }

    /// 1-based page containing the zero-based `line_index`.
    ///
    /// Empty pages own no lines, so a line always maps to the last page
    /// that starts at or before it.
    pub fn page_of(&self, line_index: usize) -> Option<u32> {
        let starts = self.page_starts.as_ref()?;
        let page = starts.partition_point(|&start| start <= line_index);
        u32::try_from(page.max(1)).ok()
    }
}

/// Inclusive, 1-based line span of a chunk within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The atomic indexed unit: a window of consecutive document lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub filename: String,
    pub page: Option<u32>,
    pub chunk_id: usize,
    pub line_range: LineRange,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    #[serde(skip)]
    pub hash: String,
}

/// A stored chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Insertion sequence number, unique within one index.
    pub seq: u64,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieval output record.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    pub filename: String,
    pub page: Option<u32>,
    pub chunk_id: usize,
    pub line_range: LineRange,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_text: Option<String>,
}

impl ScoredResult {
    pub fn new(chunk: Chunk, score: f32, highlighted_text: Option<String>) -> Self {
        Self {
            filename: chunk.filename,
            page: chunk.page,
            chunk_id: chunk.chunk_id,
            line_range: chunk.line_range,
            score,
            text: chunk.text,
            highlighted_text,
        }
    }

    /// Highlighted rendering if present, otherwise the raw text.
    pub fn display_text(&self) -> &str {
        self.highlighted_text.as_deref().unwrap_or(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_filename("a.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("notes.Docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = DocumentFormat::from_filename("notes.txt").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref filename } if filename == "notes.txt"));
        assert!(DocumentFormat::from_filename("README").is_err());
    }

    #[test]
    fn page_of_maps_lines_to_pages() {
        let doc = Document::paged("a.pdf", DocumentFormat::Pdf, vec![lines(3), lines(2)]);
        assert_eq!(doc.line_count(), 5);
        assert_eq!(doc.page_count(), Some(2));
        assert_eq!(doc.page_of(0), Some(1));
        assert_eq!(doc.page_of(2), Some(1));
        assert_eq!(doc.page_of(3), Some(2));
        assert_eq!(doc.page_of(4), Some(2));
    }

    #[test]
    fn empty_pages_are_skipped() {
        let doc = Document::paged("a.pdf", DocumentFormat::Pdf, vec![vec![], lines(2), vec![], lines(1)]);
        assert_eq!(doc.page_of(0), Some(2));
        assert_eq!(doc.page_of(2), Some(4));
    }

    #[test]
    fn unpaged_documents_have_no_page() {
        let doc = Document::unpaged("a.docx", DocumentFormat::Docx, lines(4));
        assert_eq!(doc.page_of(0), None);
        assert_eq!(doc.page_count(), None);
    }

    #[test]
    fn line_range_display() {
        let r = LineRange { start: 21, end: 40 };
        assert_eq!(r.to_string(), "21-40");
        assert_eq!(r.len(), 20);
    }
}
