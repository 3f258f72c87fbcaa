//! Namespace-scoped artifact store
//!
//! Wraps a [`VectorStoreDriver`] and an [`EmbeddingProvider`]: artifacts are
//! embedded on the way in, serialized into entry metadata, and rebuilt on the
//! way out.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, ToolMemoryError};
use crate::storage::driver::{StoredEntry, VectorStoreDriver};

pub struct ArtifactStore {
    driver: Arc<dyn VectorStoreDriver>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ArtifactStore {
    pub fn new(driver: Arc<dyn VectorStoreDriver>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { driver, embedder }
    }

    pub fn driver(&self) -> &Arc<dyn VectorStoreDriver> {
        &self.driver
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed and store one artifact under `namespace`.
    ///
    /// Every call writes a new entry, even for an artifact stored before.
    /// Returns the entry id.
    pub async fn upsert(&self, namespace: &str, artifact: &Artifact) -> Result<String> {
        let vector = self.embedder.embed(&artifact.text).await?;
        let entry = Self::to_entry(namespace, artifact, vector)?;
        let id = entry.id.clone();

        self.driver.upsert(entry).await?;
        debug!("Stored artifact {} in namespace {}", artifact.id, namespace);

        Ok(id)
    }

    /// Embed and store several artifacts, possibly across namespaces.
    ///
    /// All embeddings are computed before anything is written, so an
    /// embedding failure leaves the store untouched. Whether a driver failure
    /// midway leaves a partial write is up to the driver.
    pub async fn upsert_many<'a, I>(&self, batches: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [Artifact])>,
    {
        let mut pending: Vec<(&str, &Artifact)> = Vec::new();
        for (namespace, artifacts) in batches {
            pending.extend(artifacts.iter().map(|a| (namespace, a)));
        }

        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|(_, a)| a.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != pending.len() {
            return Err(ToolMemoryError::Embedding(format!(
                "Expected {} embeddings, provider returned {}",
                pending.len(),
                vectors.len()
            )));
        }

        let entries = pending
            .into_iter()
            .zip(vectors)
            .map(|((namespace, artifact), vector)| Self::to_entry(namespace, artifact, vector))
            .collect::<Result<Vec<_>>>()?;
        let count = entries.len();

        self.driver.upsert_many(entries).await?;
        debug!("Stored {} artifacts", count);

        Ok(count)
    }

    /// All artifacts of `namespace` in insertion order; empty for an unknown namespace
    pub async fn load(&self, namespace: &str) -> Result<Vec<Artifact>> {
        self.driver
            .load(namespace)
            .await?
            .into_iter()
            .map(Self::from_entry)
            .collect()
    }

    /// Up to `top_k` artifacts nearest to `vector`, with their distances
    pub async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<(Artifact, f32)>> {
        self.driver
            .query(namespace, vector, top_k)
            .await?
            .into_iter()
            .map(|hit| Ok((Self::from_entry(hit.entry)?, hit.distance)))
            .collect()
    }

    /// Names of all namespaces holding at least one artifact
    pub async fn namespaces(&self) -> Result<Vec<String>> {
        self.driver.namespaces().await
    }

    fn to_entry(namespace: &str, artifact: &Artifact, vector: Vec<f32>) -> Result<StoredEntry> {
        let metadata = serde_json::to_value(artifact)?;
        Ok(StoredEntry::new(
            namespace,
            Uuid::new_v4().to_string(),
            vector,
            artifact.text.clone(),
            metadata,
        ))
    }

    fn from_entry(entry: StoredEntry) -> Result<Artifact> {
        // Entries written by other tools carry no artifact metadata.
        let bare = match &entry.metadata {
            serde_json::Value::Null => true,
            serde_json::Value::Object(fields) => fields.is_empty(),
            _ => false,
        };
        if bare {
            return Ok(Artifact::text(entry.text));
        }

        serde_json::from_value::<Artifact>(entry.metadata).map_err(|e| {
            ToolMemoryError::Serialization(format!(
                "Entry {} in namespace {} has unreadable artifact metadata: {e}",
                entry.id, entry.namespace
            ))
        })
    }
}
