//! Durable key-value storage for client-local settings

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

pub const TOKEN_KEY: &str = "jukebox_token";
pub const VOLUME_KEY: &str = "jukebox_volume";

/// Synchronous key-value persistence capability
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock(entries: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

/// Key-value store backed by a single JSON object on disk.
///
/// Every write rewrites the whole file, so the on-disk copy is current as
/// soon as `set` or `remove` returns.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries: HashMap<String, String> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Discarding unreadable local storage"
                        );
                        HashMap::new()
                    }
                }
            }
        } else {
            HashMap::new()
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened local storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn save_to_disk(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        // Replace atomically; a torn write must never become the live file
        let content = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.save_to_disk(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.save_to_disk(&entries)?;
        }
        Ok(())
    }
}

/// Volatile store, used when nothing should outlive the process
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("jukebox-rs-{}-{}", std::process::id(), name))
            .join("store.json")
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);

        let store = FileStore::open(&path).unwrap();
        store.set(TOKEN_KEY, "secret").unwrap();
        store.set(VOLUME_KEY, "0").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("secret"));
        assert_eq!(reopened.get(VOLUME_KEY).unwrap().as_deref(), Some("0"));

        reopened.remove(TOKEN_KEY).unwrap();
        drop(reopened);

        let again = FileStore::open(&path).unwrap();
        assert_eq!(again.get(TOKEN_KEY).unwrap(), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn truncated_file_opens_empty_and_is_rewritten() {
        let path = temp_path("truncated");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"jukebox_token\": \"T\", \"jukebox_vol").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.set(VOLUME_KEY, "0.3").unwrap();
        drop(store);

        let content = fs::read_to_string(&path).unwrap();
        let entries: HashMap<String, String> = serde_json::from_str(&content).unwrap();
        assert_eq!(entries.get(VOLUME_KEY).map(String::as_str), Some("0.3"));
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn memory_store_remove_is_idempotent() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
