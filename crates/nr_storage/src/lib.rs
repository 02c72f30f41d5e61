use nr_core::{Error, KeyValueStore, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub mod backends;
pub mod collection;
pub mod marks;
pub mod state;

pub use backends::*;
pub use collection::{CollectionStore, Persisted, SaveOutcome, MIN_RETAINED};
pub use marks::MarkSet;
pub use state::{PlaybackPosition, PositionSnapshot};

/// Key layout of the durable store.
pub mod keys {
    pub const ARTICLES: &str = "nr_articles";
    pub const LAST_UPDATE: &str = "nr_last_update";
    pub const READ: &str = "nr_read_articles";
    pub const SAVED: &str = "nr_saved_articles";
    pub const HIDE_READ: &str = "nr_hide_read";
    pub const LAST_POSITION: &str = "nr_last_position";
    pub const PLAYBACK: &str = "nr_playback";
}

pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn store_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Builds the configured backend: `memory` or `file` (requires `dir`).
pub fn create_storage(
    backend: &str,
    dir: Option<&Path>,
    quota_bytes: Option<usize>,
) -> Result<Arc<dyn KeyValueStore>> {
    match backend {
        "memory" => Ok(Arc::new(MemoryStorage::with_config(MemoryConfig { quota_bytes }))),
        "file" => {
            let dir = dir.ok_or_else(|| {
                Error::Config("file storage needs a data directory".to_string())
            })?;
            Ok(Arc::new(FileStorage::new(FileConfig {
                dir: dir.to_path_buf(),
                quota_bytes,
            })?))
        }
        other => Err(Error::Config(format!(
            "Unknown storage backend: '{}'. Available: memory, file",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{CollectionStore, MarkSet, SaveOutcome};
}
