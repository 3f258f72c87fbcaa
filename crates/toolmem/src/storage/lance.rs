use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray, TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tracing::debug;

use crate::error::{Result, ToolMemoryError};
use crate::storage::driver::{DistanceMetric, SearchHit, StoredEntry, VectorStoreDriver};

const ARTIFACTS_TABLE: &str = "artifacts";
const DISTANCE_COLUMN: &str = "_distance";

/// LanceDB-backed vector store driver.
///
/// All namespaces share one `artifacts` table; every query is filtered by the
/// `namespace` column. Insertion order is kept through the `created_at` and
/// `position` columns. Replacing an existing id moves it to the end of that
/// order.
pub struct LanceVectorStore {
    connection: Connection,
    table: Option<Table>,
    dimension: usize,
    metric: DistanceMetric,
    /// Last `created_at` written, kept strictly increasing across batches
    last_written: AtomicI64,
}

impl LanceVectorStore {
    pub async fn connect(path: &Path, dimension: usize, metric: DistanceMetric) -> Result<Self> {
        let uri = path
            .to_str()
            .ok_or_else(|| ToolMemoryError::Storage("Invalid path encoding".to_string()))?;

        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to connect to LanceDB: {e}")))?;

        Ok(Self {
            connection,
            table: None,
            dimension,
            metric,
            last_written: AtomicI64::new(0),
        })
    }

    /// Connect and open the artifacts table, creating it on first use
    pub async fn open(path: &Path, dimension: usize, metric: DistanceMetric) -> Result<Self> {
        let mut store = Self::connect(path, dimension, metric).await?;
        if store.table_exists(ARTIFACTS_TABLE).await? {
            debug!("Opening existing artifacts table");
            store.open_artifacts_table().await?;
        } else {
            debug!("Creating artifacts table");
            store.create_artifacts_table().await?;
        }
        Ok(store)
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("namespace", DataType::Utf8, false),
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "created_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("position", DataType::Int32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension as i32,
                ),
                false,
            ),
        ]))
    }

    pub async fn create_artifacts_table(&mut self) -> Result<()> {
        let schema = self.schema();
        let batch = self.entries_to_batch(&[], schema.clone())?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let table = self
            .connection
            .create_table(ARTIFACTS_TABLE, Box::new(batches))
            .execute()
            .await
            .map_err(|e| {
                ToolMemoryError::Storage(format!("Failed to create artifacts table: {e}"))
            })?;

        self.table = Some(table);
        Ok(())
    }

    pub async fn open_artifacts_table(&mut self) -> Result<()> {
        let table = self
            .connection
            .open_table(ARTIFACTS_TABLE)
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to open artifacts table: {e}")))?;

        self.table = Some(table);
        Ok(())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to list tables: {e}")))?;

        Ok(names.contains(&name.to_string()))
    }

    fn table(&self) -> Result<&Table> {
        self.table
            .as_ref()
            .ok_or_else(|| ToolMemoryError::Storage("Artifacts table not initialized".to_string()))
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::Euclidean => DistanceType::L2,
            DistanceMetric::Dot => DistanceType::Dot,
        }
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let next = |last: i64| now.max(last + 1);
        match self
            .last_written
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)))
        {
            Ok(last) | Err(last) => next(last),
        }
    }

    fn entries_to_batch(
        &self,
        entries: &[StoredEntry],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != self.dimension) {
            return Err(ToolMemoryError::Storage(format!(
                "Embedding for entry {} has {} dimensions, table expects {}",
                bad.id,
                bad.vector.len(),
                self.dimension
            )));
        }

        let now = self.next_timestamp();

        let namespaces: Vec<&str> = entries.iter().map(|e| e.namespace.as_str()).collect();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let created_at: Vec<i64> = vec![now; entries.len()];
        let positions: Vec<i32> = (0..entries.len() as i32).collect();
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let metadata: Vec<String> = entries.iter().map(|e| e.metadata.to_string()).collect();
        let metadata_refs: Vec<&str> = metadata.iter().map(String::as_str).collect();
        let embeddings: Vec<Option<Vec<Option<f32>>>> = entries
            .iter()
            .map(|e| Some(e.vector.iter().map(|&v| Some(v)).collect()))
            .collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(namespaces)),
                Arc::new(StringArray::from(ids)),
                Arc::new(TimestampMicrosecondArray::from(created_at).with_timezone("UTC")),
                Arc::new(Int32Array::from(positions)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(metadata_refs)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(embeddings, self.dimension as i32)),
            ],
        )
        .map_err(|e| ToolMemoryError::Storage(format!("Failed to create RecordBatch: {e}")))
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| ToolMemoryError::Storage(format!("Failed to get {name} column")))
    }

    /// Convert every row of a batch back into `(entry, created_at, position, distance)`
    fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<(StoredEntry, i64, i32, Option<f32>)>> {
        let namespace_array = Self::string_column(batch, "namespace")?;
        let id_array = Self::string_column(batch, "id")?;
        let text_array = Self::string_column(batch, "text")?;
        let metadata_array = Self::string_column(batch, "metadata")?;

        let created_at_array = batch
            .column_by_name("created_at")
            .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
            .ok_or_else(|| {
                ToolMemoryError::Storage("Failed to get created_at column".to_string())
            })?;

        let position_array = batch
            .column_by_name("position")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| ToolMemoryError::Storage("Failed to get position column".to_string()))?;

        let embedding_array = batch
            .column_by_name("embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| ToolMemoryError::Storage("Failed to get embedding column".to_string()))?;

        let distance_array = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        let mut rows = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let embedding_list = embedding_array.value(row);
            let embedding_values = embedding_list
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| {
                    ToolMemoryError::Storage("Failed to get embedding values".to_string())
                })?;
            let vector: Vec<f32> = (0..embedding_values.len())
                .map(|i| embedding_values.value(i))
                .collect();

            let metadata = serde_json::from_str(metadata_array.value(row)).map_err(|e| {
                ToolMemoryError::Storage(format!("Failed to parse entry metadata: {e}"))
            })?;

            let entry = StoredEntry {
                namespace: namespace_array.value(row).to_string(),
                id: id_array.value(row).to_string(),
                vector,
                text: text_array.value(row).to_string(),
                metadata,
            };

            let distance = distance_array
                .filter(|d| !d.is_null(row))
                .map(|d| d.value(row));

            rows.push((
                entry,
                created_at_array.value(row),
                position_array.value(row),
                distance,
            ));
        }

        Ok(rows)
    }

    async fn delete_ids(&self, namespace: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let id_list = ids
            .iter()
            .map(|id| format!("'{}'", escape_sql(id)))
            .collect::<Vec<_>>()
            .join(", ");

        self.table()?
            .delete(&format!(
                "namespace = '{}' AND id IN ({id_list})",
                escape_sql(namespace)
            ))
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to replace entries: {e}")))?;

        Ok(())
    }

    async fn add(&self, entries: &[StoredEntry]) -> Result<()> {
        let schema = self.schema();
        let batch = self.entries_to_batch(entries, schema.clone())?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        self.table()?
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to insert entries: {e}")))?;

        Ok(())
    }

    /// Total number of entries across all namespaces
    pub async fn count(&self) -> Result<usize> {
        self.table()?
            .count_rows(None)
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to count rows: {e}")))
    }
}

#[async_trait]
impl VectorStoreDriver for LanceVectorStore {
    async fn upsert(&self, entry: StoredEntry) -> Result<()> {
        self.upsert_many(vec![entry]).await
    }

    async fn upsert_many(&self, entries: Vec<StoredEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut by_namespace: Vec<(&str, Vec<&str>)> = Vec::new();
        for entry in &entries {
            match by_namespace.iter_mut().find(|(ns, _)| *ns == entry.namespace) {
                Some((_, ids)) => ids.push(entry.id.as_str()),
                None => by_namespace.push((entry.namespace.as_str(), vec![entry.id.as_str()])),
            }
        }
        for (namespace, ids) in &by_namespace {
            self.delete_ids(namespace, ids).await?;
        }

        self.add(&entries).await
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let stream = self
            .table()?
            .query()
            .nearest_to(vector)
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to create vector query: {e}")))?
            .distance_type(self.distance_type())
            .only_if(format!("namespace = '{}'", escape_sql(namespace)))
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to execute search: {e}")))?;

        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(|e| {
            ToolMemoryError::Storage(format!("Failed to collect search results: {e}"))
        })?;

        let mut hits = Vec::new();
        for batch in &batches {
            for (entry, _, _, distance) in Self::batch_to_rows(batch)? {
                let distance =
                    distance.unwrap_or_else(|| self.metric.distance(vector, &entry.vector));
                hits.push(SearchHit { entry, distance });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn load(&self, namespace: &str) -> Result<Vec<StoredEntry>> {
        let stream = self
            .table()?
            .query()
            .only_if(format!("namespace = '{}'", escape_sql(namespace)))
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to query namespace: {e}")))?;

        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(|e| {
            ToolMemoryError::Storage(format!("Failed to collect query results: {e}"))
        })?;

        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(Self::batch_to_rows(batch)?);
        }
        rows.sort_by_key(|(_, created_at, position, _)| (*created_at, *position));

        Ok(rows.into_iter().map(|(entry, _, _, _)| entry).collect())
    }

    async fn namespaces(&self) -> Result<Vec<String>> {
        let stream = self
            .table()?
            .query()
            .select(lancedb::query::Select::columns(&["namespace"]))
            .execute()
            .await
            .map_err(|e| ToolMemoryError::Storage(format!("Failed to list namespaces: {e}")))?;

        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(|e| {
            ToolMemoryError::Storage(format!("Failed to collect namespaces: {e}"))
        })?;

        let mut names = Vec::new();
        for batch in &batches {
            let column = Self::string_column(batch, "namespace")?;
            for row in 0..batch.num_rows() {
                names.push(column.value(row).to_string());
            }
        }
        names.sort();
        names.dedup();

        Ok(names)
    }

    fn name(&self) -> &'static str {
        "lance"
    }
}

fn escape_sql(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DIM: usize = 4;

    fn entry(namespace: &str, id: &str, vector: [f32; DIM]) -> StoredEntry {
        StoredEntry::new(
            namespace,
            id,
            vector.to_vec(),
            format!("text {id}"),
            json!({"id": id}),
        )
    }

    async fn create_test_store() -> (LanceVectorStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::open(dir.path(), DIM, DistanceMetric::Cosine)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_open_creates_table() {
        let (store, _dir) = create_test_store().await;
        assert!(store.table_exists(ARTIFACTS_TABLE).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_schema_embedding_dimension() {
        let (store, _dir) = create_test_store().await;
        let schema = store.schema();
        let field = schema.field_with_name("embedding").unwrap();

        match field.data_type() {
            DataType::FixedSizeList(_, size) => assert_eq!(*size, DIM as i32),
            _ => panic!("Expected FixedSizeList type for embedding field"),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_load_in_order() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert_many(vec![
                entry("ns", "first", [1.0, 0.0, 0.0, 0.0]),
                entry("ns", "second", [0.0, 1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();
        store
            .upsert(entry("ns", "third", [0.0, 0.0, 1.0, 0.0]))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .load("ns")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_load_round_trips_metadata() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert(entry("ns", "a", [1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();

        let loaded = store.load("ns").await.unwrap();
        assert_eq!(loaded[0].metadata, json!({"id": "a"}));
        assert_eq!(loaded[0].text, "text a");
        assert_eq!(loaded[0].vector.len(), DIM);
    }

    #[tokio::test]
    async fn test_upsert_same_id_replaces() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert(entry("ns", "a", [1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(entry("ns", "a", [0.0, 1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let loaded = store.load("ns").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].vector, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_query_scoped_and_ordered() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert_many(vec![
                entry("ns", "x", [1.0, 0.0, 0.0, 0.0]),
                entry("ns", "y", [0.0, 1.0, 0.0, 0.0]),
                entry("other", "z", [1.0, 0.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query("ns", &[0.9, 0.1, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.id, "x");
        assert!(hits.iter().all(|h| h.entry.namespace == "ns"));
    }

    #[tokio::test]
    async fn test_namespace_with_quote_is_escaped() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert(entry("it's", "a", [1.0, 0.0, 0.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(store.load("it's").await.unwrap().len(), 1);
        assert_eq!(store.namespaces().await.unwrap(), vec!["it's"]);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_storage_error() {
        let (store, _dir) = create_test_store().await;
        let bad = StoredEntry::new("ns", "a", vec![1.0; DIM + 1], "t", json!(null));

        let result = store.upsert(bad).await;
        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LanceVectorStore::open(dir.path(), DIM, DistanceMetric::Cosine)
                .await
                .unwrap();
            store
                .upsert(entry("ns", "kept", [1.0, 0.0, 0.0, 0.0]))
                .await
                .unwrap();
        }

        let store = LanceVectorStore::open(dir.path(), DIM, DistanceMetric::Cosine)
            .await
            .unwrap();
        let loaded = store.load("ns").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "kept");
    }
}
