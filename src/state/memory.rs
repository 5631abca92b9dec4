//! In-memory state store.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{StateError, StateStore};

/// Volatile state store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StateError {
    StateError::Backend("state lock poisoned".to_string())
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StateError> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StateError> {
        let mut values = self.values.write().map_err(poisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
