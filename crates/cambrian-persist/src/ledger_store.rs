//! Round-ledger persistence

use std::sync::Arc;
use tracing::debug;

use cambrian_core::ledger::{RoundLedger, RoundRecord};

use crate::backend::{StorageBackend, StorageError, StorageExt};

const LEDGER_KEY: &str = "ledger/rounds";

pub struct LedgerStore {
    backend: Arc<dyn StorageBackend>,
}

impl LedgerStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub async fn save(&self, ledger: &RoundLedger) -> Result<(), StorageError> {
        self.backend.set(LEDGER_KEY, ledger).await
    }

    /// Load the run history; a missing document is an empty ledger.
    pub async fn load(&self) -> Result<RoundLedger, StorageError> {
        Ok(self
            .backend
            .get(LEDGER_KEY)
            .await?
            .unwrap_or_else(RoundLedger::new))
    }

    /// Append one completed round and persist.
    pub async fn append(&self, record: RoundRecord) -> Result<(), StorageError> {
        let mut ledger = self.load().await?;
        debug!(round = record.round, entries = record.entries.len(), "appending round");
        ledger.append(record);
        self.save(&ledger).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use cambrian_core::ledger::ActionOutcome;

    #[tokio::test]
    async fn empty_store_loads_empty_ledger() {
        let store = LedgerStore::new(Arc::new(MemoryBackend::new()));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_accumulate() {
        let store = LedgerStore::new(Arc::new(MemoryBackend::new()));
        let mut round = RoundRecord::new(1);
        round.push("agent_1", ActionOutcome::Acted { tool: "square".into() }, 12.0);
        store.append(round).await.unwrap();
        store.append(RoundRecord::new(2)).await.unwrap();

        let ledger = store.load().await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.records()[0].entries[0].energy_delta, 12.0);
    }
}
