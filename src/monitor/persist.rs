//! Durable history persistence
//!
//! Backend seam for the three namespaced history blobs. The file-backed
//! store is the default; the in-memory store backs tests and embedded use.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Persistence failure categories
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend is out of space or quota; triggers retention reduction
    #[error("storage capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage backend for named JSON blobs
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Persist one named blob, replacing any previous value
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Load one named blob, if present
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

/// File-backed blob store: one JSON file per key under a base directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    /// Create the store, creating the base directory if needed
    pub async fn new(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base = base.into();
        tokio::fs::create_dir_all(&base)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { base })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

#[async_trait]
impl HistoryStorage for FileStore {
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Backend(e.to_string()))?;
        let path = self.path_for(key);
        debug!(key, bytes = bytes.len(), "persisting history blob");

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
            ) {
                StorageError::CapacityExceeded(e.to_string())
            } else {
                StorageError::Backend(e.to_string())
            }
        })
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Backend(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}

/// In-memory blob store with an optional per-blob size cap.
///
/// The cap makes the capacity-failure recovery path testable without
/// filling a real filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: parking_lot::Mutex<HashMap<String, Value>>,
    capacity_limit: parking_lot::Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Create an unbounded in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail saves whose serialized size exceeds `limit` bytes
    pub fn set_capacity_limit(&self, limit: Option<usize>) {
        *self.capacity_limit.lock() = limit;
    }
}

#[async_trait]
impl HistoryStorage for MemoryStore {
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if let Some(limit) = *self.capacity_limit.lock() {
            let size = serde_json::to_vec(value)
                .map_err(|e| StorageError::Backend(e.to_string()))?
                .len();
            if size > limit {
                return Err(StorageError::CapacityExceeded(format!(
                    "{size} bytes exceeds limit of {limit}"
                )));
            }
        }

        self.blobs.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.blobs.lock().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();

        let value = json!({"chain_getBlock": {"https://rpc.example.com": [1, 2, 3]}});
        store.save("rpc-monitor-data-by-method", &value).await.unwrap();

        let loaded = store.load("rpc-monitor-data-by-method").await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_file_store_missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        assert!(store.load("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_capacity_limit() {
        let store = MemoryStore::new();
        store.set_capacity_limit(Some(8));

        let big = json!({"key": "a long enough payload"});
        let err = store.save("blob", &big).await.unwrap_err();
        assert!(matches!(err, StorageError::CapacityExceeded(_)));

        store.set_capacity_limit(None);
        store.save("blob", &big).await.unwrap();
        assert_eq!(store.load("blob").await.unwrap(), Some(big));
    }
}
