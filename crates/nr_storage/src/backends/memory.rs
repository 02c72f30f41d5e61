use nr_core::{Error, KeyValueStore, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    /// Upper bound on the summed size of keys and values, in bytes
    pub quota_bytes: Option<usize>,
}

pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new(quota_bytes: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes,
        }
    }

    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(limit) = self.quota_bytes {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Process-local store; the default for tests and `--storage memory`.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    config: MemoryConfig,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(config.quota_bytes)));
        Self { store, config }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut store = self.store.write().map_err(poisoned)?;
        store.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().map_err(poisoned)?;
        store.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("missing").unwrap(), None);

        storage.set("nr_hide_read", "true").unwrap();
        assert_eq!(storage.get("nr_hide_read").unwrap().as_deref(), Some("true"));

        storage.remove("nr_hide_read").unwrap();
        storage.remove("nr_hide_read").unwrap();
        assert_eq!(storage.get("nr_hide_read").unwrap(), None);
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let storage = MemoryStorage::with_config(MemoryConfig {
            quota_bytes: Some(12),
        });
        storage.set("k", "0123456789").unwrap();
        // replacing the same key only needs room for the new value
        storage.set("k", "abcdefghij").unwrap();

        let err = storage.set("other", "xx").unwrap_err();
        assert!(err.is_quota());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("abcdefghij"));
    }
}
