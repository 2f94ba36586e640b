use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// String-keyed, string-valued store with a fixed total capacity. A write
/// that does not fit fails as a whole and leaves the store unchanged.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// In-memory bounded store. Usage counts key and value bytes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    capacity: usize,
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let replaced = self
            .entries
            .get(key)
            .map(|old| key.len() + old.len())
            .unwrap_or(0);
        let available = self.capacity.saturating_sub(self.used_bytes() - replaced);
        let needed = key.len() + value.len();

        if needed > available {
            debug!(
                "Write of '{}' rejected: {} bytes needed, {} available",
                key, needed, available
            );
            return Err(StoreError::QuotaExceeded { needed, available });
        }

        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Bounded store persisted as a JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut inner = MemoryStore::new(capacity);

        if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Backend {
                details: format!("Failed to read {}: {}", path.display(), e),
            })?;
            let entries: BTreeMap<String, String> =
                serde_json::from_str(&raw).map_err(|e| StoreError::Backend {
                    details: format!("Failed to parse {}: {}", path.display(), e),
                })?;
            inner.entries = entries;
            debug!(
                "Loaded {} key(s) from {} ({} bytes)",
                inner.len(),
                path.display(),
                inner.used_bytes()
            );
        }

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self.inner.entries()).map_err(|e| {
            StoreError::Backend {
                details: e.to_string(),
            }
        })?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Backend {
            details: format!("Failed to write {}: {}", self.path.display(), e),
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.inner.get(key);
        self.inner.set(key, value)?;

        if let Err(e) = self.flush() {
            match previous {
                Some(old) => {
                    self.inner.entries.insert(key.to_string(), old);
                }
                None => self.inner.remove(key),
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.inner.remove(key);
        if let Err(e) = self.flush() {
            warn!("Removed '{}' in memory but could not persist: {}", key, e);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}
