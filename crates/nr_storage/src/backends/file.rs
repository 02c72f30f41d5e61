use nr_core::{Error, KeyValueStore, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub dir: PathBuf,
    /// Upper bound on the summed size of all stored values, in bytes
    pub quota_bytes: Option<usize>,
}

/// One file per key under a directory. Writes go through a temp file and a rename,
/// so a crash leaves either the old or the new value.
pub struct FileStorage {
    config: FileConfig,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(config: FileConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create storage directory {}: {}",
                config.dir.display(),
                e
            ))
        })?;
        Ok(Self {
            config,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.config.dir.join(format!("{}.json", key)))
    }

    fn used_without(&self, target: &Path) -> Result<usize> {
        let mut used = 0;
        for entry in fs::read_dir(&self.config.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == target || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            used += entry.metadata()?.len() as usize;
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("file store lock poisoned".to_string()))?;

        if let Some(limit) = self.config.quota_bytes {
            let needed = self.used_without(&path)? + value.len();
            if needed > limit {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
