//! Durable key/value state shared by the monitor and the admin API.
//!
//! Values are JSON so they can hold scalars (timestamps, version strings) as
//! well as whole status snapshots.
//!
//! # Implementations
//!
//! - [`MemoryStateStore`]: volatile, for development and tests
//! - [`PersistentStateStore`]: fjall-backed, survives restarts

mod factory;
mod memory;
mod persistent;

pub use factory::create_state_store;
pub use memory::MemoryStateStore;
pub use persistent::PersistentStateStore;

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Schema version the operator expects to be active.
pub const SCHEMA_VERSION_KEY: &str = "search_api_pantheon.schema_version";

/// Last fetched core status snapshot.
pub const CORE_STATUS_KEY: &str = "search_api_pantheon.core_status";

/// Unix time (seconds) of the last completed status check.
pub const LAST_STATUS_CHECK_KEY: &str = "search_api_pantheon.last_status_check";

/// State store error.
#[derive(Debug, Error)]
pub enum StateError {
    /// Backend failure.
    #[error("state backend error: {0}")]
    Backend(String),

    /// Stored bytes are not valid JSON.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value state store.
///
/// Reads and writes are independent; there is no read-modify-write
/// transaction, so concurrent writers race with last-writer-wins semantics.
pub trait StateStore: Send + Sync {
    /// Read a value, `None` if the key is unset.
    fn get(&self, key: &str) -> Result<Option<Value>, StateError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: Value) -> Result<(), StateError>;

    /// Remove a key. Returns true if it existed.
    fn delete(&self, key: &str) -> Result<bool, StateError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Read a value as an unsigned integer, `default` when unset or not numeric.
    fn get_u64_or(&self, key: &str, default: u64) -> Result<u64, StateError> {
        Ok(self
            .get(key)?
            .and_then(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(default))
    }

    /// Read a value as a string, `None` when unset or not a JSON string.
    fn get_string(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.get(key)?.and_then(|value| match value {
            Value::String(s) => Some(s),
            _ => None,
        }))
    }
}

/// A shared state store.
pub type SharedStateStore = Arc<dyn StateStore>;
