//! Test utilities for toolmem - mock capabilities
//!
//! Deterministic stand-ins for the embedding provider, the summarizer and
//! the vector store driver, so unit and integration tests run without model
//! downloads or network access.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::{EMBEDDING_DIMENSION, EmbeddingProvider};
use crate::error::{Result, ToolMemoryError};
use crate::storage::{LocalVectorStore, SearchHit, StoredEntry, VectorStoreDriver};
use crate::summarizer::{Summarizer, SummarizerError};

/// Mock embedding provider for fast unit tests that don't need real ML.
/// Produces deterministic 384-dimensional vectors based on input text hash.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn vectorize(text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        (0..EMBEDDING_DIMENSION)
            .map(|i| {
                let x = seed
                    .wrapping_mul(i as u64 + 1)
                    .wrapping_add(0x9e3779b97f4a7c15);
                let normalized = (x as f32) / (u64::MAX as f32);
                (normalized * 2.0) - 1.0 // Range [-1, 1]
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vectorize(text))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Returns the same vector for every text
#[derive(Debug, Clone)]
pub struct FixedEmbedding {
    vector: Vec<f32>,
}

impl FixedEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Fails every call with an embedding error
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingProvider for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(ToolMemoryError::Embedding("embedding backend offline".to_string()))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Returns a fixed summary and records how it was called
#[derive(Debug, Default)]
pub struct StaticSummarizer {
    summary: String,
    calls: AtomicUsize,
    last_input: Mutex<Option<String>>,
}

impl StaticSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text passed to the most recent call
    pub fn last_input(&self) -> Option<String> {
        self.last_input.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, text: &str) -> std::result::Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_input.lock() {
            *guard = Some(text.to_string());
        }
        Ok(self.summary.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Behaves like an unreachable upstream model
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _text: &str) -> std::result::Result<String, SummarizerError> {
        Err(SummarizerError::UpstreamUnavailable(
            "connection refused".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Wraps a driver and counts every call that reaches it
pub struct RecordingDriver {
    inner: Arc<dyn VectorStoreDriver>,
    upserts: AtomicUsize,
    queries: AtomicUsize,
    loads: AtomicUsize,
}

impl RecordingDriver {
    pub fn new(inner: Arc<dyn VectorStoreDriver>) -> Self {
        Self {
            inner,
            upserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Total calls of any kind
    pub fn calls(&self) -> usize {
        self.upserts() + self.queries() + self.loads()
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new(Arc::new(LocalVectorStore::default()))
    }
}

#[async_trait]
impl VectorStoreDriver for RecordingDriver {
    async fn upsert(&self, entry: StoredEntry) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(entry).await
    }

    async fn upsert_many(&self, entries: Vec<StoredEntry>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_many(entries).await
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(namespace, vector, top_k).await
    }

    async fn load(&self, namespace: &str) -> Result<Vec<StoredEntry>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(namespace).await
    }

    async fn namespaces(&self) -> Result<Vec<String>> {
        self.inner.namespaces().await
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Fails every call with a storage error
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDriver;

impl FailingDriver {
    fn unavailable<T>() -> Result<T> {
        Err(ToolMemoryError::Storage("vector store unavailable".to_string()))
    }
}

#[async_trait]
impl VectorStoreDriver for FailingDriver {
    async fn upsert(&self, _entry: StoredEntry) -> Result<()> {
        Self::unavailable()
    }

    async fn query(
        &self,
        _namespace: &str,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        Self::unavailable()
    }

    async fn load(&self, _namespace: &str) -> Result<Vec<StoredEntry>> {
        Self::unavailable()
    }

    async fn namespaces(&self) -> Result<Vec<String>> {
        Self::unavailable()
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedding_is_deterministic() {
        let model = MockEmbedding::new();
        let emb1 = model.embed("hello world").await.unwrap();
        let emb2 = model.embed("hello world").await.unwrap();
        assert_eq!(emb1, emb2);
    }

    #[tokio::test]
    async fn mock_embedding_has_correct_dimensions() {
        let model = MockEmbedding::new();
        let emb = model.embed("test").await.unwrap();
        assert_eq!(emb.len(), 384);
    }

    #[tokio::test]
    async fn mock_embedding_values_in_range() {
        let model = MockEmbedding::new();
        let emb = model.embed("some text").await.unwrap();
        assert!(emb.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn static_summarizer_records_calls() {
        let summarizer = StaticSummarizer::new("done");
        assert_eq!(summarizer.calls(), 0);
        assert!(summarizer.last_input().is_none());

        let out = summarizer.summarize("input").await.unwrap();

        assert_eq!(out, "done");
        assert_eq!(summarizer.calls(), 1);
        assert_eq!(summarizer.last_input().as_deref(), Some("input"));
    }

    #[tokio::test]
    async fn recording_driver_counts_calls() {
        let driver = RecordingDriver::default();
        driver
            .upsert(StoredEntry::new("ns", "a", vec![1.0], "a", serde_json::Value::Null))
            .await
            .unwrap();
        driver.load("ns").await.unwrap();
        driver.query("ns", &[1.0], 1).await.unwrap();

        assert_eq!(driver.upserts(), 1);
        assert_eq!(driver.loads(), 1);
        assert_eq!(driver.queries(), 1);
        assert_eq!(driver.calls(), 3);
    }

    #[tokio::test]
    async fn failing_driver_returns_storage_errors() {
        let result = FailingDriver.load("ns").await;
        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
    }
}
