//! JSON-file-backed key-value store.
//!
//! The whole map lives in one file (`local-storage.json` in the data dir) and
//! is rewritten on every mutation. Values are small and writes rare, so there
//! is no caching layer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{data_dir, KvStore};
use crate::error::StorageError;

pub struct FileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `<data_dir>/local-storage.json`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn open() -> Result<Self, StorageError> {
        Ok(Self::at(data_dir()?.join("local-storage.json")))
    }

    /// Use an explicit file path. The file is created lazily on first write.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::ReadFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_err = |message: String| StorageError::WriteFailed {
            path: self.path.clone(),
            message,
        };
        let content = serde_json::to_string_pretty(map).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| write_err(e.to_string()))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.lock
            .lock()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard()?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");

        let store = FileStore::at(&path);
        store.set(keys::REFRESH_PAUSED, "true").unwrap();
        store.set(keys::REFRESH_START_TIME, "1700000000000").unwrap();
        drop(store);

        let reopened = FileStore::at(&path);
        assert_eq!(
            reopened.get(keys::REFRESH_PAUSED).unwrap().as_deref(),
            Some("true")
        );
        reopened.remove(keys::REFRESH_PAUSED).unwrap();
        assert!(reopened.get(keys::REFRESH_PAUSED).unwrap().is_none());
        assert!(reopened.get(keys::REFRESH_START_TIME).unwrap().is_some());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::at(dir.path().join("absent.json"));
        assert!(store.get(keys::AUTH_TOKEN).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::at(&path);
        assert!(matches!(
            store.get(keys::AUTH_TOKEN),
            Err(StorageError::ReadFailed { .. })
        ));
    }
}
