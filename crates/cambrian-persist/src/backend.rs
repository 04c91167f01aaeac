//! Storage backend contract
//!
//! [`StorageBackend`] stays object-safe by speaking `serde_json::Value`;
//! [`StorageExt`] layers the typed get/set on top for any backend. Stores
//! hold an `Arc<dyn StorageBackend>` and never care which one.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Value-level key/value storage. Keys are slash-separated paths
/// (`registry/agent_1`, `ledger/rounds`).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn is_healthy(&self) -> bool;

    async fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Typed layer over any [`StorageBackend`].
#[async_trait]
pub trait StorageExt: StorageBackend {
    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value =
            serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set_value(key, value).await
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_value(key).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }
}

impl<B: StorageBackend + ?Sized> StorageExt for B {}

/// In-memory backend for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        n: u32,
        label: String,
    }

    #[tokio::test]
    async fn typed_round_trip() {
        let backend = MemoryBackend::new();
        let blob = Blob {
            n: 7,
            label: "seven".into(),
        };
        backend.set("test/blob", &blob).await.unwrap();
        let loaded: Option<Blob> = backend.get("test/blob").await.unwrap();
        assert_eq!(loaded, Some(blob));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let backend = MemoryBackend::new();
        let loaded: Option<Blob> = backend.get("absent").await.unwrap();
        assert!(loaded.is_none());
        assert!(!backend.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let backend = MemoryBackend::new();
        backend.set("registry/agent_1", &1u32).await.unwrap();
        backend.set("registry/agent_2", &2u32).await.unwrap();
        backend.set("ledger/rounds", &3u32).await.unwrap();

        let keys = backend.list_keys("registry/").await.unwrap();
        assert_eq!(keys, vec!["registry/agent_1", "registry/agent_2"]);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let backend = MemoryBackend::new();
        backend.set("k", &1u32).await.unwrap();
        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
    }
}
