//! State store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::config::{StateBackend, StateConfig};

use super::{MemoryStateStore, PersistentStateStore, SharedStateStore};

/// Resolve the data directory, falling back to the platform data dir.
fn resolve_data_dir(config_path: Option<&Path>) -> PathBuf {
    if let Some(path) = config_path {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        return std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path);
    }

    dirs::data_dir()
        .map(|p| p.join("coreguard"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local/share/coreguard"))
                .unwrap_or_else(|| PathBuf::from("./data"))
        })
}

/// Create a state store based on configuration.
pub fn create_state_store(config: &StateConfig) -> anyhow::Result<SharedStateStore> {
    match config.backend {
        StateBackend::Memory => {
            tracing::warn!("using in-memory state (volatile), the check interval resets every run");
            Ok(Arc::new(MemoryStateStore::new()))
        }
        StateBackend::Persistent => {
            let data_dir = resolve_data_dir(config.path.as_deref());
            tracing::info!(path = %data_dir.display(), "using persistent state");
            let store = PersistentStateStore::open(&data_dir)
                .with_context(|| format!("failed to open state at {}", data_dir.display()))?;
            Ok(store as SharedStateStore)
        }
    }
}
