mod config;
mod file_store;

pub use config::{ApiConfig, Config, ExportConfig, RefreshConfig};
pub use file_store::FileStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

/// Well-known storage keys.
pub mod keys {
    pub const AUTH_TOKEN: &str = "authToken";
    pub const REFRESH_PAUSED: &str = "auto-refresh-paused";
    pub const REFRESH_PROGRESS: &str = "auto-refresh-progress";
    pub const REFRESH_START_TIME: &str = "auto-refresh-start-time";
    /// Heartbeat (epoch ms) of the driver currently cycling the coordinator.
    pub const REFRESH_OWNER: &str = "auto-refresh-owner";
}

/// Returns `~/.config/setra[-dev]/` based on SETRA_ENV.
///
/// Set SETRA_ENV=dev to use the development data directory, or
/// SETRA_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("SETRA_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SETRA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("setra-dev")
            } else {
                base_dir.join("setra")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::WriteFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// String-only durable key-value storage.
///
/// Absence of a key always means "use the default".
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StorageError {
        StorageError::Unavailable("memory store lock poisoned".into())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.entries.lock().map_err(|_| Self::poisoned())?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.entries.lock().map_err(|_| Self::poisoned())?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let view = store.clone();
        store.set(keys::AUTH_TOKEN, "abc").unwrap();
        assert_eq!(view.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("abc"));
        view.remove(keys::AUTH_TOKEN).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").unwrap().is_none());
        // removing an absent key is fine
        store.remove("nope").unwrap();
    }
}
