//! Rendering of results, ingest summaries and chunk listings.
//!
//! Everything writes to a caller-supplied `Write` so the CLI can target
//! stdout while tests capture into a buffer.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use docqa_core::models::{Chunk, ScoredResult};

use crate::session::{IngestOutcome, IngestSummary};

/// Printed when a query produced no results.
pub const NOT_FOUND_MESSAGE: &str = "Answer not found in the provided document context.";

/// Human-readable result listing, best match first.
pub fn write_results(out: &mut impl Write, results: &[ScoredResult]) -> std::io::Result<()> {
    for (i, result) in results.iter().enumerate() {
        writeln!(out, "Match #{} (score {:.3})", i + 1, result.score)?;
        writeln!(out, "    file: {}", result.filename)?;
        match result.page {
            Some(page) => writeln!(out, "    page: {}", page)?,
            None => writeln!(out, "    page: -")?,
        }
        writeln!(out, "    chunk: {}", result.chunk_id)?;
        writeln!(out, "    lines: {}", result.line_range)?;
        writeln!(out)?;
        for line in result.display_text().lines() {
            writeln!(out, "    {}", line)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Results as a pretty-printed JSON array.
pub fn write_results_json(out: &mut impl Write, results: &[ScoredResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

/// Save the top result as pretty JSON.
pub fn write_best(path: &Path, best: &ScoredResult) -> Result<()> {
    let json = serde_json::to_string_pretty(best)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write best result to {}", path.display()))
}

/// One line per document plus failures, in the style of a sync report.
pub fn write_ingest_summary(out: &mut impl Write, summary: &IngestSummary) -> std::io::Result<()> {
    writeln!(out, "ingest")?;
    for outcome in &summary.outcomes {
        match outcome {
            IngestOutcome::Indexed(report) => {
                write!(
                    out,
                    "  {}: {} chunks indexed",
                    report.filename, report.indexed
                )?;
                if report.is_partial() {
                    write!(out, ", {} skipped", report.skipped.len())?;
                }
                writeln!(out)?;
                for skip in &report.skipped {
                    writeln!(
                        out,
                        "    skipped chunk {} (lines {}): {}",
                        skip.chunk_id, skip.line_range, skip.reason
                    )?;
                }
            }
            IngestOutcome::Unchanged { filename } => {
                writeln!(out, "  {}: unchanged", filename)?;
            }
        }
    }
    for failure in &summary.failures {
        writeln!(out, "  {}: failed: {:#}", failure.path.display(), failure.error)?;
    }
    writeln!(out, "  total chunks: {}", summary.chunks_indexed())?;
    Ok(())
}

/// Chunk metadata listing for `docqa chunks`.
pub fn write_chunks(out: &mut impl Write, chunks: &[Chunk]) -> std::io::Result<()> {
    for chunk in chunks {
        let page = chunk
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "chunk {}  page {}  lines {}  ({} chars)",
            chunk.chunk_id,
            page,
            chunk.line_range,
            chunk.text.chars().count()
        )?;
    }
    writeln!(out, "{} chunks", chunks.len())?;
    Ok(())
}
