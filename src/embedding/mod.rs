//! Embedding providers.
//!
//! Each provider implements [`docqa_core::embedding::Embedder`] and is
//! created once per process by [`create_embedder`]:
//!
//! | Config Value | Provider |
//! |-------------|----------|
//! | `"local"` | [`LocalEmbedder`] (fastembed, feature `local-embeddings-fastembed`) |
//! | `"ollama"` | [`OllamaEmbedder`] |
//! | `"hash"` | [`HashEmbedder`] (no model download) |
//!
//! The local model is downloaded from Hugging Face on first use and cached.
//! After that, embedding runs entirely offline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use docqa_core::embedding::{check_dims, validate_texts, Embedder, HashEmbedder, DEFAULT_DIMS};
use docqa_core::EmbeddingError;

use crate::config::EmbeddingConfig;

const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the configured embedder. Model start-up failures are returned here,
/// before any document is read.
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider.as_str() {
        "hash" => Arc::new(HashEmbedder::new(config.dims.unwrap_or(DEFAULT_DIMS))),
        "ollama" => Arc::new(OllamaEmbedder::new(config)?),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => {
            let config = config.clone();
            let embedder = tokio::task::spawn_blocking(move || LocalEmbedder::new(&config))
                .await
                .context("local model initialisation task failed")??;
            Arc::new(embedder)
        }
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "embedding.provider = \"local\" requires the local-embeddings-fastembed feature. \
             Rebuild with default features or use provider = \"ollama\" or \"hash\"."
        ),
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or hash.",
            other
        ),
    };
    info!(
        provider = %config.provider,
        model = embedder.model_name(),
        dims = embedder.dims(),
        "embedder ready"
    );
    Ok(embedder)
}

/// Model name and vector dimension for the local provider.
pub fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" | "bge-small-en-v1.5" | "multilingual-e5-small" => 384,
        "bge-base-en-v1.5" | "multilingual-e5-base" => 768,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
        _ => DEFAULT_DIMS,
    });

    (model_name, dims)
}

// ============ Local Provider (fastembed) ============

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

/// Sentence-transformer inference through fastembed (bundled ORT).
///
/// The model is loaded once in [`LocalEmbedder::new`] and shared behind a
/// mutex; each batch runs on the blocking thread pool.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    /// Load (and on first use download) the model. Blocking.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        let fastembed_model = config_to_fastembed_model(&model_name)?;
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::Init(e.to_string()))
        .with_context(|| format!("Failed to initialize local embedding model '{}'", model_name))?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_texts(texts)?;
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let inputs = texts.to_vec();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| EmbeddingError::Model("local model lock poisoned".to_string()))?;
            model
                .embed(inputs, Some(batch_size))
                .map_err(|e| EmbeddingError::Model(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| EmbeddingError::Model(e.to_string()))??;

        check_dims(&vectors, texts.len(), self.dims)?;
        Ok(vectors)
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured Ollama URL (default: `http://localhost:11434`).
/// Requires Ollama to be running with an embedding model pulled (e.g. `ollama pull nomic-embed-text`).
/// Each batch is a single request; failures are not retried.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model,
            dims,
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_texts(texts)?;
        debug!(count = texts.len(), url = %self.url, "ollama embed request");

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                EmbeddingError::Model(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Model(format!(
                "Ollama API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;
        let vectors = parse_ollama_response(&json)?;
        check_dims(&vectors, texts.len(), self.dims)?;
        Ok(vectors)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
    let invalid = |what: &str| EmbeddingError::Model(format!("Invalid Ollama response: {}", what));

    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .ok_or_else(|| invalid("embedding is not an array"))?
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(|f| f as f32)
                        .ok_or_else(|| invalid("non-numeric embedding value"))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_resolve_local_model_defaults() {
        let (name, dims) = resolve_local_model(&config("local"));
        assert_eq!(name, "all-minilm-l6-v2");
        assert_eq!(dims, 384);
    }

    #[test]
    fn test_resolve_local_model_table_and_override() {
        let mut cfg = config("local");
        cfg.model = Some("bge-base-en-v1.5".to_string());
        assert_eq!(resolve_local_model(&cfg).1, 768);
        cfg.dims = Some(512);
        assert_eq!(resolve_local_model(&cfg).1, 512);
    }

    #[tokio::test]
    async fn test_hash_provider() {
        let mut cfg = config("hash");
        cfg.dims = Some(64);
        let embedder = create_embedder(&cfg).await.unwrap();
        assert_eq!(embedder.model_name(), "hash");
        assert_eq!(embedder.dims(), 64);
        let v = embedder.embed("rain water").await.unwrap();
        assert_eq!(v.len(), 64);
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let err = create_embedder(&config("openai")).await.err().unwrap();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_ollama_requires_model_and_dims() {
        assert!(OllamaEmbedder::new(&config("ollama")).is_err());
        let mut cfg = config("ollama");
        cfg.model = Some("nomic-embed-text".to_string());
        cfg.dims = Some(768);
        cfg.url = Some("http://127.0.0.1:11434/".to_string());
        let embedder = OllamaEmbedder::new(&cfg).unwrap();
        assert_eq!(embedder.url(), "http://127.0.0.1:11434");
        assert_eq!(embedder.dims(), 768);
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "embeddings": [[0.5, -0.25], [1.0, 0.0]] });
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, -0.25], vec![1.0, 0.0]]);

        let bad = serde_json::json!({ "embedding": [] });
        assert!(parse_ollama_response(&bad).is_err());
        let bad = serde_json::json!({ "embeddings": [["x"]] });
        assert!(parse_ollama_response(&bad).is_err());
    }

    #[tokio::test]
    async fn test_ollama_rejects_blank_text_without_request() {
        let mut cfg = config("ollama");
        cfg.model = Some("m".to_string());
        cfg.dims = Some(4);
        // unroutable; a request would fail with a connection error instead
        cfg.url = Some("http://127.0.0.1:9".to_string());
        let embedder = OllamaEmbedder::new(&cfg).unwrap();
        let err = embedder.embed_batch(&["  ".to_string()]).await.unwrap_err();
        assert_eq!(err, EmbeddingError::EmptyText { index: 0 });
    }
}
