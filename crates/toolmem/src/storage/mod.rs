//! Storage layer
//!
//! The [`VectorStoreDriver`] capability with its in-memory and LanceDB
//! implementations, and the namespace-scoped [`ArtifactStore`] built on top.

pub mod artifact_store;
pub mod driver;
pub mod lance;
pub mod local;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use artifact_store::ArtifactStore;
pub use driver::{DistanceMetric, SearchHit, StoredEntry, VectorStoreDriver};
pub use lance::LanceVectorStore;
pub use local::LocalVectorStore;

/// Open the driver selected by `config` for vectors of `dimension`
pub async fn open_driver(
    config: &StorageConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStoreDriver>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(LocalVectorStore::new(config.metric))),
        StorageBackend::Lance => {
            let path = config.data_dir.join("lance");
            std::fs::create_dir_all(&path)?;
            let store = LanceVectorStore::open(&path, dimension, config.metric).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_driver() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let driver = open_driver(&config, 8).await.unwrap();
        assert_eq!(driver.name(), "local");
    }

    #[tokio::test]
    async fn test_open_lance_driver_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Lance,
            data_dir: dir.path().join("nested"),
            ..StorageConfig::default()
        };
        let driver = open_driver(&config, 8).await.unwrap();
        assert_eq!(driver.name(), "lance");
        assert!(dir.path().join("nested").join("lance").exists());
    }
}
