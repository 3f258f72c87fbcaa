//! Embedding providers
//!
//! The [`EmbeddingProvider`] trait is the capability the artifact store and
//! the query engine use to turn text into vectors. Two implementations ship
//! with the crate: a fastembed-backed model and a deterministic hashing
//! embedder that works offline.

use std::hash::Hasher;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;
use twox_hash::XxHash64;

use crate::config::EmbeddingConfig;
use crate::error::{Result, ToolMemoryError};

/// Dimension of the bundled fastembed models
pub const EMBEDDING_DIMENSION: usize = 384;

/// Trait for embedding providers (local model, remote API, test doubles)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a fixed-size vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of the vectors this provider produces
    fn dimension(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Local embedding model backed by fastembed (ONNX runtime)
pub struct FastEmbedProvider {
    model: TokioMutex<TextEmbedding>,
}

impl FastEmbedProvider {
    /// Load the default model (multilingual-e5-small)
    pub fn new() -> Result<Self> {
        Self::with_model("multilingual-e5-small")
    }

    /// Load a model by its short name.
    ///
    /// Supported: `multilingual-e5-small`, `all-minilm-l6-v2`, `bge-small-en-v1.5`.
    /// All of them produce 384-dimensional vectors.
    pub fn with_model(name: &str) -> Result<Self> {
        let model = match name {
            "multilingual-e5-small" => FastEmbedModel::MultilingualE5Small,
            "all-minilm-l6-v2" => FastEmbedModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => FastEmbedModel::BGESmallENV15,
            other => {
                return Err(ToolMemoryError::Config(format!(
                    "Unknown embedding model: {other}"
                )));
            }
        };

        let model = TextEmbedding::try_new(InitOptions::new(model))
            .map_err(|e| ToolMemoryError::Embedding(e.to_string()))?;

        Ok(Self {
            model: TokioMutex::new(model),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self
            .model
            .lock()
            .await
            .embed(vec![text.to_string()], None)
            .map_err(|e| ToolMemoryError::Embedding(e.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ToolMemoryError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding batch of {} texts", texts.len());
        self.model
            .lock()
            .await
            .embed(texts.to_vec(), None)
            .map_err(|e| ToolMemoryError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn name(&self) -> &'static str {
        "fastembed"
    }
}

const HASH_SEED: u64 = 0;

/// Deterministic feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dimension`
/// buckets and the resulting bag-of-words vector is L2-normalized, so texts
/// sharing vocabulary land close together under cosine distance. Needs no
/// model download.
///
/// Buckets come from XXH64 with a fixed seed, so vectors written to a
/// persistent store stay comparable across builds.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = XxHash64::with_seed(HASH_SEED);
            hasher.write(token.to_lowercase().as_bytes());
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

/// Build the provider named in `config`
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedProvider::with_model(&config.model)?)),
        "hash" => Ok(Arc::new(HashEmbedding::new(config.dimension))),
        other => Err(ToolMemoryError::Config(format!(
            "Unknown embedding provider: {other}"
        ))),
    }
}
