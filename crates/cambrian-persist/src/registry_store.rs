//! Registry index persistence
//!
//! Each agent's registry is stored as one index document under
//! `registry/<agent_id>`: the record map plus a metadata envelope
//! (`agent_id`, `total_tools`, `last_updated`, `version`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use cambrian_core::registry::{ToolRecord, ToolRegistry};

use crate::backend::{StorageBackend, StorageError, StorageExt};

const INDEX_VERSION: &str = "1.0";
const KEY_PREFIX: &str = "registry/";

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub agent_id: String,
    pub total_tools: usize,
    pub last_updated: DateTime<Utc>,
    pub version: String,
}

/// The persisted shape of one agent's registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryIndex {
    pub tools: BTreeMap<String, ToolRecord>,
    pub metadata: IndexMetadata,
}

pub struct RegistryStore {
    backend: Arc<dyn StorageBackend>,
}

impl RegistryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    fn key(agent_id: &str) -> String {
        format!("{KEY_PREFIX}{agent_id}")
    }

    pub async fn save(&self, registry: &ToolRegistry) -> Result<(), StorageError> {
        let tools: BTreeMap<String, ToolRecord> = registry
            .snapshot()
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();
        let index = RegistryIndex {
            metadata: IndexMetadata {
                agent_id: registry.agent_id().to_string(),
                total_tools: tools.len(),
                last_updated: Utc::now(),
                version: INDEX_VERSION.to_string(),
            },
            tools,
        };
        self.backend
            .set(&Self::key(registry.agent_id()), &index)
            .await?;
        info!(
            agent = registry.agent_id(),
            tools = index.metadata.total_tools,
            "saved registry index"
        );
        Ok(())
    }

    pub async fn load(&self, agent_id: &str) -> Result<Option<ToolRegistry>, StorageError> {
        let index: Option<RegistryIndex> = self.backend.get(&Self::key(agent_id)).await?;
        Ok(index.map(|idx| {
            ToolRegistry::hydrate(agent_id, idx.tools.into_values().collect())
        }))
    }

    /// Agent ids with a persisted registry, sorted.
    pub async fn list_agents(&self) -> Result<Vec<String>, StorageError> {
        let keys = self.backend.list_keys(KEY_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn seeded_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new("agent_1");
        registry
            .register(
                ToolRecord::new("square", "squares a number", "agent_1", 2)
                    .with_source("return x * x\n"),
            )
            .unwrap();
        registry.record_composition("square");
        registry
    }

    #[tokio::test]
    async fn round_trips_adoption_history() {
        let store = RegistryStore::new(Arc::new(MemoryBackend::new()));
        store.save(&seeded_registry()).await.unwrap();

        let loaded = store.load("agent_1").await.unwrap().unwrap();
        assert_eq!(loaded.agent_id(), "agent_1");
        assert_eq!(loaded.get("square").unwrap().adoption_count, 1);
        assert_eq!(loaded.get("square").unwrap().source, "return x * x\n");
    }

    #[tokio::test]
    async fn index_envelope_matches_layout() {
        let backend = Arc::new(MemoryBackend::new());
        let store = RegistryStore::new(backend.clone());
        store.save(&seeded_registry()).await.unwrap();

        let raw = backend.get_value("registry/agent_1").await.unwrap().unwrap();
        assert_eq!(raw["metadata"]["agent_id"], "agent_1");
        assert_eq!(raw["metadata"]["total_tools"], 1);
        assert_eq!(raw["metadata"]["version"], INDEX_VERSION);
        assert!(raw["tools"]["square"].is_object());
    }

    #[tokio::test]
    async fn unknown_agent_loads_none() {
        let store = RegistryStore::new(Arc::new(MemoryBackend::new()));
        assert!(store.load("agent_9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_persisted_agents() {
        let store = RegistryStore::new(Arc::new(MemoryBackend::new()));
        store.save(&seeded_registry()).await.unwrap();
        store.save(&ToolRegistry::new("agent_2")).await.unwrap();
        assert_eq!(store.list_agents().await.unwrap(), vec!["agent_1", "agent_2"]);
    }
}
