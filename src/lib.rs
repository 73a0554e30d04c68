//! # docqa
//!
//! Offline question answering over a personal PDF/DOCX corpus.
//!
//! Documents are extracted to lines, cut into fixed windows of lines,
//! embedded with a sentence-embedding model and kept in an in-memory
//! vector index for the life of the process. A question is embedded the
//! same way and answered with the best-matching passages, each carrying
//! its file, page, chunk number and line range, with query terms marked.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Extract    │──▶│  Pipeline   │──▶│ InMemory     │
//! │  PDF/DOCX   │   │ Chunk+Embed │   │ VectorIndex  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                                     ┌──────▼──────┐
//!                                     │  Retriever  │
//!                                     │ + Highlight │
//!                                     └──────┬──────┘
//!                                            ▼
//!                                     ask / chat CLI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`embedding`] | Embedding providers (fastembed, Ollama, hash) |
//! | [`session`] | Process-wide ingest and query state |
//! | [`output`] | Result, summary and chunk rendering |
//! | [`chat`] | Interactive question loop |
//!
//! The chunker, embedder trait, index, retriever and highlighter live in
//! the I/O-free [`docqa_core`] crate.

pub mod chat;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod output;
pub mod session;

pub use docqa_core;
