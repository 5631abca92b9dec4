//! Persistent state using fjall (pure Rust LSM-tree).
//!
//! Every write is flushed to the journal before returning, so the last
//! check timestamp and snapshot survive restarts.

use std::path::Path;
use std::sync::Arc;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde_json::Value;

use super::{StateError, StateStore};

const PARTITION: &str = "state";

impl From<fjall::Error> for StateError {
    fn from(e: fjall::Error) -> Self {
        StateError::Backend(e.to_string())
    }
}

/// Durable state store backed by a fjall keyspace.
pub struct PersistentStateStore {
    keyspace: Keyspace,
    state: PartitionHandle,
}

impl std::fmt::Debug for PersistentStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStateStore").finish_non_exhaustive()
    }
}

impl PersistentStateStore {
    /// Open or create the store at the given directory.
    pub fn open(path: &Path) -> Result<Arc<Self>, StateError> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let state = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        let store = Arc::new(Self { keyspace, state });

        tracing::info!(
            path = %path.display(),
            keys = store.state.len().unwrap_or(0),
            "persistent state opened"
        );

        Ok(store)
    }

    fn persist(&self) -> Result<(), StateError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

impl StateStore for PersistentStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        match self.state.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StateError> {
        let bytes = serde_json::to_vec(&value)?;
        self.state.insert(key.as_bytes(), bytes)?;
        self.persist()
    }

    fn delete(&self, key: &str) -> Result<bool, StateError> {
        let existed = self.state.contains_key(key.as_bytes())?;
        if existed {
            self.state.remove(key.as_bytes())?;
            self.persist()?;
        }
        Ok(existed)
    }

    fn name(&self) -> &'static str {
        "persistent"
    }
}
