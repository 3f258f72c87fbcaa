//! Vector query engine
//!
//! Embeds the query text, retrieves the nearest artifacts of one namespace
//! and composes their text into a single answer artifact.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::artifact::Artifact;
use crate::config::QueryConfig;
use crate::error::Result;
use crate::storage::ArtifactStore;

pub struct QueryEngine {
    store: Arc<ArtifactStore>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(store: Arc<ArtifactStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Answer `text` from the artifacts stored in `namespace`.
    ///
    /// Returns an info artifact when the namespace holds nothing. Embedding
    /// and storage failures are returned as errors, never as partial answers.
    pub async fn query(&self, text: &str, namespace: &str) -> Result<Artifact> {
        let vector = self.store.embedder().embed(text).await?;
        let hits = self.store.query(namespace, &vector, self.config.top_k).await?;

        if hits.is_empty() {
            debug!("No hits for query in namespace {}", namespace);
            return Ok(Artifact::info(format!(
                "No relevant information found in namespace \"{namespace}\""
            )));
        }

        debug!("Query matched {} artifacts in {}", hits.len(), namespace);

        let sources: Vec<_> = hits
            .iter()
            .map(|(artifact, distance)| {
                json!({
                    "artifact_id": artifact.id,
                    "distance": distance,
                })
            })
            .collect();

        let answer = hits
            .iter()
            .map(|(artifact, _)| artifact.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.config.separator);

        let answer = match self.config.max_answer_chars {
            Some(max) => truncate_chars(&answer, max),
            None => answer,
        };

        Ok(Artifact::text(answer).with_value(json!({
            "namespace": namespace,
            "sources": sources,
        })))
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolMemoryError;
    use crate::storage::{DistanceMetric, LocalVectorStore};
    use crate::testing::{FailingEmbedding, FixedEmbedding, MockEmbedding};

    fn engine_with(
        embedder: Arc<dyn crate::embedding::EmbeddingProvider>,
        config: QueryConfig,
    ) -> QueryEngine {
        let driver = Arc::new(LocalVectorStore::new(DistanceMetric::Euclidean));
        QueryEngine::new(Arc::new(ArtifactStore::new(driver, embedder)), config)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo world", 5), "héllo");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[tokio::test]
    async fn test_query_empty_namespace_returns_info() {
        let engine = engine_with(Arc::new(MockEmbedding::new()), QueryConfig::default());

        let answer = engine.query("anything", "missing").await.unwrap();

        assert!(answer.is_info());
        assert!(answer.text.contains("missing"));
    }

    #[tokio::test]
    async fn test_query_returns_stored_content() {
        let engine = engine_with(
            Arc::new(FixedEmbedding::new(vec![1.0, 0.0])),
            QueryConfig::default(),
        );
        engine
            .store()
            .upsert("ns", &Artifact::text("foobar"))
            .await
            .unwrap();

        let answer = engine.query("foo", "ns").await.unwrap();

        assert!(!answer.is_info());
        assert_eq!(answer.text, "foobar");
        assert_eq!(answer.value.as_ref().unwrap()["namespace"], "ns");
    }

    #[tokio::test]
    async fn test_query_respects_top_k_and_separator() {
        let config = QueryConfig {
            top_k: 2,
            separator: " | ".to_string(),
            max_answer_chars: None,
        };
        let engine = engine_with(Arc::new(FixedEmbedding::new(vec![1.0, 0.0])), config);
        for text in ["one", "two", "three"] {
            engine.store().upsert("ns", &Artifact::text(text)).await.unwrap();
        }

        let answer = engine.query("q", "ns").await.unwrap();

        // Equidistant hits keep insertion order.
        assert_eq!(answer.text, "one | two");
        assert_eq!(answer.value.unwrap()["sources"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_truncates_answer() {
        let config = QueryConfig {
            max_answer_chars: Some(3),
            ..QueryConfig::default()
        };
        let engine = engine_with(Arc::new(FixedEmbedding::new(vec![1.0])), config);
        engine
            .store()
            .upsert("ns", &Artifact::text("abcdef"))
            .await
            .unwrap();

        let answer = engine.query("q", "ns").await.unwrap();
        assert_eq!(answer.text, "abc");
    }

    #[tokio::test]
    async fn test_query_embedding_failure_propagates() {
        let engine = engine_with(Arc::new(FailingEmbedding), QueryConfig::default());

        let result = engine.query("q", "ns").await;
        assert!(matches!(result, Err(ToolMemoryError::Embedding(_))));
    }
}
