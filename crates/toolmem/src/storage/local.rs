//! In-memory vector store driver
//!
//! Keeps every namespace as an insertion-ordered list of entries and answers
//! queries with an exhaustive scan. Suitable for a single reasoning session;
//! nothing survives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::driver::{DistanceMetric, SearchHit, StoredEntry, VectorStoreDriver};

#[derive(Debug, Default)]
pub struct LocalVectorStore {
    metric: DistanceMetric,
    namespaces: RwLock<HashMap<String, Vec<StoredEntry>>>,
}

impl LocalVectorStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of entries across all namespaces
    pub async fn len(&self) -> usize {
        self.namespaces.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn insert(map: &mut HashMap<String, Vec<StoredEntry>>, entry: StoredEntry) {
        let entries = map.entry(entry.namespace.clone()).or_default();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}

#[async_trait]
impl VectorStoreDriver for LocalVectorStore {
    async fn upsert(&self, entry: StoredEntry) -> Result<()> {
        let mut map = self.namespaces.write().await;
        Self::insert(&mut map, entry);
        Ok(())
    }

    async fn upsert_many(&self, entries: Vec<StoredEntry>) -> Result<()> {
        // Single write lock: readers never observe a partially applied batch.
        let mut map = self.namespaces.write().await;
        for entry in entries {
            Self::insert(&mut map, entry);
        }
        Ok(())
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let map = self.namespaces.read().await;
        let Some(entries) = map.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|entry| SearchHit {
                distance: self.metric.distance(vector, &entry.vector),
                entry: entry.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equidistant entries.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn load(&self, namespace: &str) -> Result<Vec<StoredEntry>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .namespaces
            .read()
            .await
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
