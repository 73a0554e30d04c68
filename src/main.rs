//! # docqa CLI
//!
//! The `docqa` binary ingests PDF and DOCX files into an in-memory index
//! and answers questions against them. Nothing is persisted: every
//! invocation ingests its inputs afresh.
//!
//! ## Usage
//!
//! ```bash
//! docqa [--config ./config/docqa.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ask <inputs>... --query "<text>"` | Ingest, answer one question, exit |
//! | `docqa chat <inputs>...` | Ingest, then answer questions read from stdin |
//! | `docqa chunks <input>` | Extract and chunk a file without embedding |
//!
//! ## Examples
//!
//! ```bash
//! # One question over a folder of manuals
//! docqa ask ./manuals --query "how often to clean the filter"
//!
//! # Only search one file, machine-readable output
//! docqa ask ./manuals --query "warranty" --file pump.pdf --json
//!
//! # Inspect how a document is cut into chunks
//! docqa chunks ./manuals/pump.pdf --chunk-lines 10
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa::chat::{run_chat, ChatState};
use docqa::config::{self, Config};
use docqa::extract::extract_document;
use docqa::output;
use docqa::session::{expand_inputs, Session};
use docqa_core::chunk::chunk_document;
use docqa_core::models::DocumentFormat;

/// docqa: ask questions about your own PDF and DOCX documents, offline.
///
/// Every setting has a default; `--config` points to an optional TOML file.
/// See `config/docqa.example.toml` for the full layout.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Ask questions about your PDF and DOCX documents, answered with ranked source passages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set (e.g. `info`, `docqa=debug`).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and answer a single question.
    ///
    /// Results are printed best match first. When nothing matches,
    /// "Answer not found in the provided document context." is printed.
    Ask {
        /// Files or directories (searched recursively for .pdf and .docx).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// The question.
        #[arg(long, short)]
        query: String,

        /// Only answer from this file name (e.g. `manual.pdf`).
        #[arg(long)]
        file: Option<String>,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,

        /// Do not mark query terms in the result text.
        #[arg(long)]
        no_highlight: bool,

        /// Write the best result to this file as JSON.
        #[arg(long)]
        best_out: Option<PathBuf>,
    },

    /// Ingest documents and answer questions read from stdin, one per line.
    ///
    /// Commands: `:files`, `:filter <name>`, `:filter`, `:top <n>`, `:quit`.
    Chat {
        /// Files or directories (searched recursively for .pdf and .docx).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Initial file-name filter.
        #[arg(long)]
        file: Option<String>,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Extract and chunk one document without embedding it.
    Chunks {
        /// A .pdf or .docx file.
        input: PathBuf,

        /// Lines per chunk (defaults to `chunking.chunk_lines`).
        #[arg(long)]
        chunk_lines: Option<usize>,

        /// Print the chunks as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Ask {
            inputs,
            query,
            file,
            top_k,
            json,
            no_highlight,
            best_out,
        } => {
            let session = ingest(cfg, &inputs).await?;
            let highlight = if no_highlight { Some(false) } else { None };
            let results = session
                .query(&query, file.as_deref(), top_k, highlight)
                .await?;

            let mut stdout = std::io::stdout();
            if results.is_empty() {
                eprintln!("{}", output::NOT_FOUND_MESSAGE);
            }
            if json {
                output::write_results_json(&mut stdout, &results)?;
            } else {
                output::write_results(&mut stdout, &results)?;
            }
            if let (Some(path), Some(best)) = (best_out.as_deref(), results.first()) {
                output::write_best(path, best)?;
            }
        }
        Commands::Chat {
            inputs,
            file,
            top_k,
        } => {
            let session = ingest(cfg, &inputs).await?;
            let state = ChatState {
                filter: file,
                top_k: top_k.unwrap_or(session.config().retrieval.top_k),
            };
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_chat(&session, stdin, &mut std::io::stdout(), state).await?;
        }
        Commands::Chunks {
            input,
            chunk_lines,
            json,
        } => {
            let filename = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("not a file path: {}", input.display()))?;
            DocumentFormat::from_filename(&filename)?;
            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let document = extract_document(&filename, &bytes)?;
            let chunks = chunk_document(&document, chunk_lines.unwrap_or(cfg.chunking.chunk_lines))?;

            let mut stdout = std::io::stdout();
            if json {
                serde_json::to_writer_pretty(&mut stdout, &chunks)?;
                writeln!(stdout)?;
            } else {
                output::write_chunks(&mut stdout, &chunks)?;
            }
        }
    }

    Ok(())
}

/// Build the session and ingest every input, reporting to stderr.
async fn ingest(cfg: Config, inputs: &[PathBuf]) -> anyhow::Result<Session> {
    let files = expand_inputs(inputs);
    if files.is_empty() {
        bail!("No PDF or DOCX documents found in the given inputs");
    }
    let mut session = Session::new(cfg).await?;
    let summary = session.ingest_files(files).await;
    output::write_ingest_summary(&mut std::io::stderr(), &summary)?;
    if summary.outcomes.is_empty() {
        bail!("None of the given documents could be ingested");
    }
    Ok(session)
}
