//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! pure helpers for validating inputs and outputs, and
//! [`HashEmbedder`], a deterministic model-free backend.
//!
//! Model-backed providers (fastembed, Ollama) live in the `docqa` app
//! crate. Whatever the backend, one instance is created at startup and
//! shared behind an `Arc<dyn Embedder>`; it is never reloaded per call.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::EmbeddingError;

/// Output dimension of all-MiniLM-L6-v2 and of [`HashEmbedder::default`].
pub const DEFAULT_DIMS: usize = 384;

/// A text embedding backend.
///
/// `embed_batch` must preserve input order and return exactly one vector
/// of [`dims`](Embedder::dims) floats per input. Identical inputs must
/// produce identical vectors within one process.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Model("empty embedding response".to_string()))
    }
}

/// Reject empty or whitespace-only inputs before they reach a model.
pub fn validate_texts(texts: &[String]) -> Result<(), EmbeddingError> {
    match texts.iter().position(|t| t.trim().is_empty()) {
        Some(index) => Err(EmbeddingError::EmptyText { index }),
        None => Ok(()),
    }
}

/// Check that a backend returned one vector of `dims` floats per input.
pub fn check_dims(vectors: &[Vec<f32>], inputs: usize, dims: usize) -> Result<(), EmbeddingError> {
    if vectors.len() != inputs {
        return Err(EmbeddingError::Model(format!(
            "model returned {} vectors for {} inputs",
            vectors.len(),
            inputs
        )));
    }
    match vectors.iter().find(|v| v.len() != dims) {
        Some(v) => Err(EmbeddingError::Dimension {
            expected: dims,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, zero vectors, vectors of different
/// lengths, and vectors holding non-finite values.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    let sim = dot / denom;
    if !sim.is_finite() {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0)
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lowercases the text, splits it into alphanumeric word tokens and adds
/// `±1` for every token (and every adjacent token pair, at half weight)
/// into a bucket chosen by SHA-256. The result is L2-normalised, so cosine
/// similarity reflects shared vocabulary. Needs no model download, which
/// makes it the backend for tests and `provider = "hash"`.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut v = vec![0.0f32; self.dims];
        for token in &tokens {
            self.accumulate(&mut v, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut v, joined.as_bytes(), 0.5);
        }
        normalize_l2(&mut v);
        v
    }

    fn accumulate(&self, v: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_texts(texts)?;
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
