//! Vector store driver capability
//!
//! A driver persists `(namespace, id, vector, text, metadata)` entries and
//! answers nearest-neighbor queries scoped to one namespace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One entry held by a vector store driver
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// Namespace the entry belongs to
    pub namespace: String,
    /// Entry id, unique within its namespace
    pub id: String,
    /// Embedding of `text`
    pub vector: Vec<f32>,
    /// Text that was embedded
    pub text: String,
    /// Driver-opaque metadata; the artifact store keeps the serialized artifact here
    pub metadata: Value,
}

impl StoredEntry {
    pub fn new(
        namespace: impl Into<String>,
        id: impl Into<String>,
        vector: Vec<f32>,
        text: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
            vector,
            text: text.into(),
            metadata,
        }
    }
}

/// A query result: the entry and its distance to the query vector (lower is closer)
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: StoredEntry,
    pub distance: f32,
}

/// Distance function used for nearest-neighbor search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`
    #[default]
    Cosine,
    /// Euclidean (L2) distance
    Euclidean,
    /// `1 - a·b`
    Dot,
}

impl DistanceMetric {
    /// Distance between two vectors.
    ///
    /// Vectors of different length are treated as maximally distant.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return f32::INFINITY;
        }

        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Dot => 1.0 - a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Trait for vector store backends (in-memory, LanceDB, remote indexes)
///
/// Upserting an id that already exists in the namespace replaces that entry.
/// `load` returns entries in insertion order; `query` returns at most
/// `top_k` entries ordered by ascending distance.
#[async_trait]
pub trait VectorStoreDriver: Send + Sync {
    /// Insert or replace a single entry
    async fn upsert(&self, entry: StoredEntry) -> Result<()>;

    /// Insert or replace several entries, possibly spanning namespaces
    async fn upsert_many(&self, entries: Vec<StoredEntry>) -> Result<()> {
        for entry in entries {
            self.upsert(entry).await?;
        }
        Ok(())
    }

    /// Nearest neighbors of `vector` within `namespace`
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    /// All entries of `namespace` in insertion order; empty if the namespace is unknown
    async fn load(&self, namespace: &str) -> Result<Vec<StoredEntry>>;

    /// Names of all non-empty namespaces
    async fn namespaces(&self) -> Result<Vec<String>>;

    /// Driver name for logging
    fn name(&self) -> &'static str;
}
