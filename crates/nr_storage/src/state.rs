use crate::{keys, load_json, store_json};
use nr_core::{KeyValueStore, Result};
use serde::{Deserialize, Serialize};

/// Last viewed position, written whenever a navigation transition settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub article_id: String,
    pub date: String,
    pub category: String,
    pub timestamp: String,
    pub index: usize,
}

impl PositionSnapshot {
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        load_json(store, keys::LAST_POSITION)
    }

    pub fn store(&self, store: &dyn KeyValueStore) -> Result<()> {
        store_json(store, keys::LAST_POSITION, self)
    }
}

/// Where narration was when the session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub article_id: String,
    pub chunk_index: usize,
}

impl PlaybackPosition {
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        load_json(store, keys::PLAYBACK)
    }

    pub fn store(&self, store: &dyn KeyValueStore) -> Result<()> {
        store_json(store, keys::PLAYBACK, self)
    }

    pub fn clear(store: &dyn KeyValueStore) -> Result<()> {
        store.remove(keys::PLAYBACK)
    }
}

pub fn load_hide_read(store: &dyn KeyValueStore) -> Result<bool> {
    Ok(load_json::<bool>(store, keys::HIDE_READ)?.unwrap_or(false))
}

pub fn store_hide_read(store: &dyn KeyValueStore, hide_read: bool) -> Result<()> {
    store_json(store, keys::HIDE_READ, &hide_read)
}

/// Date of the last archive merged by `fetch_latest`
pub fn load_last_update(store: &dyn KeyValueStore) -> Result<Option<String>> {
    store.get(keys::LAST_UPDATE)
}

pub fn store_last_update(store: &dyn KeyValueStore, date: &str) -> Result<()> {
    store.set(keys::LAST_UPDATE, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStorage;

    #[test]
    fn test_snapshot_round_trip() {
        let kv = MemoryStorage::new();
        assert_eq!(PositionSnapshot::load(&kv).unwrap(), None);

        let snapshot = PositionSnapshot {
            article_id: "https://example.org/a".to_string(),
            date: "2025-01-03".to_string(),
            category: "all".to_string(),
            timestamp: "2025-01-03T09:00:00Z".to_string(),
            index: 4,
        };
        snapshot.store(&kv).unwrap();
        assert_eq!(PositionSnapshot::load(&kv).unwrap(), Some(snapshot));
    }

    #[test]
    fn test_playback_position() {
        let kv = MemoryStorage::new();
        let position = PlaybackPosition {
            article_id: "a".to_string(),
            chunk_index: 2,
        };
        position.store(&kv).unwrap();
        assert_eq!(PlaybackPosition::load(&kv).unwrap(), Some(position));
        PlaybackPosition::clear(&kv).unwrap();
        assert_eq!(PlaybackPosition::load(&kv).unwrap(), None);
    }

    #[test]
    fn test_preferences_and_marker() {
        let kv = MemoryStorage::new();
        assert!(!load_hide_read(&kv).unwrap());
        store_hide_read(&kv, true).unwrap();
        assert!(load_hide_read(&kv).unwrap());
        assert_eq!(kv.get(keys::HIDE_READ).unwrap().as_deref(), Some("true"));

        assert_eq!(load_last_update(&kv).unwrap(), None);
        store_last_update(&kv, "2025-01-03").unwrap();
        assert_eq!(load_last_update(&kv).unwrap().as_deref(), Some("2025-01-03"));
    }
}
