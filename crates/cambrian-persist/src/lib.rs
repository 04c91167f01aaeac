//! Persistence for Cambrian.
//!
//! A value-level [`backend::StorageBackend`] trait with in-memory and file
//! implementations, plus typed stores for registry indexes and the round
//! ledger.

pub mod backend;
pub mod file;
pub mod ledger_store;
pub mod registry_store;

pub use backend::{MemoryBackend, StorageBackend, StorageError, StorageExt};
pub use file::FileBackend;
pub use ledger_store::LedgerStore;
pub use registry_store::{IndexMetadata, RegistryIndex, RegistryStore};
