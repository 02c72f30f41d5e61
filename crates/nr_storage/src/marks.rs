use crate::{keys, load_json, store_json};
use nr_core::{KeyValueStore, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A persisted set of article ids. Every mutation is applied in memory first and then
/// written; a failed write leaves the in-memory set authoritative and returns the error.
pub struct MarkSet {
    key: &'static str,
    ids: BTreeSet<String>,
    store: Arc<dyn KeyValueStore>,
}

impl MarkSet {
    pub fn open(store: Arc<dyn KeyValueStore>, key: &'static str) -> Result<Self> {
        let ids = load_json::<BTreeSet<String>>(store.as_ref(), key)?.unwrap_or_default();
        Ok(Self { key, ids, store })
    }

    /// The read-article set
    pub fn read(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::open(store, keys::READ)
    }

    /// The saved-article set
    pub fn saved(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::open(store, keys::SAVED)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Adds `id`; returns whether it was new. Already-present ids cause no write.
    pub fn mark(&mut self, id: &str) -> Result<bool> {
        if !self.ids.insert(id.to_string()) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Flips membership; returns whether `id` is now in the set
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let now_marked = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };
        self.persist()?;
        Ok(now_marked)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ids.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        store_json(self.store.as_ref(), self.key, &self.ids)
    }
}
