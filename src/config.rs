//! TOML configuration.
//!
//! Every section and key has a default, so the CLI runs without a config
//! file. See `config/docqa.example.toml` for the full layout.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use docqa_core::chunk::DEFAULT_CHUNK_LINES;
use docqa_core::highlight::{MatcherKind, DEFAULT_MARKER};
use docqa_core::pipeline::{EmbeddingPolicy, IngestOptions};
use docqa_core::retrieve::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_lines")]
    pub chunk_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_lines: default_chunk_lines(),
        }
    }
}

fn default_chunk_lines() -> usize {
    DEFAULT_CHUNK_LINES
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Ollama base URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub highlight: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            highlight: true,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct HighlightConfig {
    #[serde(default)]
    pub matcher: MatcherKind,
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_min_term_chars")]
    pub min_term_chars: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherKind::default(),
            marker: default_marker(),
            min_term_chars: default_min_term_chars(),
        }
    }
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}
fn default_min_term_chars() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_embedding_error: EmbeddingPolicy,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            on_embedding_error: EmbeddingPolicy::default(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Config {
    /// Options handed to the core ingestion pipeline.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            chunk_lines: self.chunking.chunk_lines,
            batch_size: self.embedding.batch_size,
            policy: self.ingest.on_embedding_error,
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_lines == 0 {
            bail!("chunking.chunk_lines must be >= 1");
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        if self.highlight.marker.is_empty() {
            bail!("highlight.marker must not be empty");
        }
        match self.embedding.provider.as_str() {
            "local" | "ollama" | "hash" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, ollama, or hash.",
                other
            ),
        }
        Ok(())
    }
}

/// Parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.chunk_lines, 20);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert!(cfg.retrieval.highlight);
        assert_eq!(cfg.embedding.provider, "local");
        assert_eq!(cfg.highlight.marker, "**");
        assert_eq!(cfg.highlight.matcher, MatcherKind::Terms);
        assert_eq!(cfg.ingest.on_embedding_error, EmbeddingPolicy::Skip);
    }

    #[test]
    fn full_file_parses() {
        let cfg = parse_config(
            r#"
[chunking]
chunk_lines = 10

[embedding]
provider = "hash"
dims = 128
batch_size = 8

[retrieval]
top_k = 5
highlight = false

[highlight]
matcher = "phrase"
marker = "=="
min_term_chars = 2

[ingest]
on_embedding_error = "abort"
max_file_bytes = 1024
"#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.chunk_lines, 10);
        assert_eq!(cfg.embedding.dims, Some(128));
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.highlight.matcher, MatcherKind::Phrase);
        assert_eq!(cfg.ingest.on_embedding_error, EmbeddingPolicy::Abort);
        let opts = cfg.ingest_options();
        assert_eq!(opts.chunk_lines, 10);
        assert_eq!(opts.batch_size, 8);
    }

    #[test]
    fn zero_chunk_lines_rejected() {
        let err = parse_config("[chunking]\nchunk_lines = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_lines"));
    }

    #[test]
    fn zero_top_k_rejected() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = parse_config("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse_config("[server]\nbind = \"x\"\n").is_err());
    }

    #[test]
    fn example_config_parses() {
        let cfg = parse_config(include_str!("../config/docqa.example.toml")).unwrap();
        assert_eq!(cfg.embedding.model.as_deref(), Some("all-minilm-l6-v2"));
        assert_eq!(cfg.ingest.max_file_bytes, 52_428_800);
    }

    #[test]
    fn bad_policy_rejected() {
        assert!(parse_config("[ingest]\non_embedding_error = \"retry\"\n").is_err());
    }
}
