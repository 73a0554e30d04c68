//! Text extraction for PDF and DOCX documents.
//!
//! Turns a file's bytes into an ordered sequence of lines: one per text
//! line for PDF (with page boundaries), one per non-blank paragraph for
//! DOCX. The format is resolved from the filename before any bytes are
//! parsed, so unsupported files are rejected up front.

use std::io::Read;

use docqa_core::models::{Document, DocumentFormat};
use docqa_core::{Error, Result};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Low-level extraction failure, before the filename is attached.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Extract `bytes` into a [`Document`] named `filename`.
pub fn extract_document(filename: &str, bytes: &[u8]) -> Result<Document> {
    let format = DocumentFormat::from_filename(filename)?;
    let result = match format {
        DocumentFormat::Pdf => extract_pdf_pages(bytes)
            .map(|pages| Document::paged(filename, format, pages)),
        DocumentFormat::Docx => extract_docx_paragraphs(bytes)
            .map(|lines| Document::unpaged(filename, format, lines)),
    };
    result.map_err(|e| Error::Extraction {
        filename: filename.to_string(),
        message: e.to_string(),
    })
}

/// Lines of every page, page 1 first.
///
/// pdf-extract opens each page with blank lines of its own; leading and
/// trailing blank lines of a page are dropped so line numbers count the
/// page's text. Blank lines between text lines of a page are kept.
pub fn extract_pdf_pages(bytes: &[u8]) -> std::result::Result<Vec<Vec<String>>, ExtractError> {
    // pdf-extract panics on some malformed input
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pages.iter().map(|page| page_lines(page)).collect())
}

fn page_lines(page: &str) -> Vec<String> {
    let lines: Vec<&str> = page.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    lines[first..=last].iter().map(|l| l.to_string()).collect()
}

/// Text of every non-blank `w:p` paragraph in `word/document.xml`.
pub fn extract_docx_paragraphs(bytes: &[u8]) -> std::result::Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    paragraphs_from_xml(&doc_xml)
}

fn paragraphs_from_xml(xml: &[u8]) -> std::result::Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    // open paragraphs, innermost last; text boxes nest a w:p inside a w:p
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => open.push(String::new()),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let ch = match e.local_name().as_ref() {
                    b"tab" => Some('\t'),
                    b"br" | b"cr" => Some(' '),
                    _ => None,
                };
                if let (Some(ch), Some(current)) = (ch, open.last_mut()) {
                    current.push(ch);
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(done) = open.pop() {
                        if !done.trim().is_empty() {
                            paragraphs.push(done);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}
