use anyhow::{Context, Result};
use nr_reader::{GestureConfig, NarrationConfig, ReaderConfig};
use nr_speech::{EngineConfig, VoiceEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "nr.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub storage: StorageConfig,
    pub reader: ReaderSection,
    pub gesture: GestureSection,
    pub narration: NarrationSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `file` or `memory`
    pub backend: String,
    pub dir: Option<PathBuf>,
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            dir: None,
            quota_bytes: Some(5 * 1024 * 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSection {
    pub phase_ms: u64,
    pub notice_ttl_ms: u64,
    pub double_activation_ms: u64,
    pub mark_key: char,
}

impl Default for ReaderSection {
    fn default() -> Self {
        let reader = ReaderConfig::default();
        Self {
            phase_ms: reader.phase_ms,
            notice_ttl_ms: reader.notice_ttl_ms,
            double_activation_ms: reader.double_activation_ms,
            mark_key: reader.mark_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSection {
    /// Gesture units per terminal column
    pub cell_width: f32,
    pub dead_zone: f32,
    pub min_swipe: f32,
    pub fade_distance: f32,
}

impl Default for GestureSection {
    fn default() -> Self {
        let gesture = GestureConfig::default();
        Self {
            cell_width: 8.0,
            dead_zone: gesture.dead_zone,
            min_swipe: gesture.min_swipe,
            fade_distance: gesture.fade_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSection {
    pub engine: String,
    pub command: Vec<String>,
    pub locale: String,
    pub rate: f32,
    pub words_per_minute: u32,
    pub max_chunk_chars: usize,
    pub settle_ms: u64,
    /// 0 disables the pause/resume nudge
    pub nudge_interval_ms: u64,
    pub keep_awake_command: Vec<String>,
    pub voices: Vec<VoiceEntry>,
}

impl Default for NarrationSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        let narration = NarrationConfig::default();
        Self {
            engine: engine.engine,
            command: engine.command,
            locale: narration.locale,
            rate: narration.rate,
            words_per_minute: engine.words_per_minute,
            max_chunk_chars: narration.max_chunk_chars,
            settle_ms: narration.settle_ms,
            nudge_interval_ms: narration.nudge_interval_ms.unwrap_or(0),
            keep_awake_command: engine.keep_awake_command,
            voices: engine.voices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file for the interactive reader; defaults to `nr.log` in the data directory
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Reads `path`, or `nr.toml` from the working directory when present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => load_config(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                load_config(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.archive.base_url)
            .with_context(|| format!("archive.base_url is not a URL: {}", self.archive.base_url))?;
        if self.archive.timeout_secs == 0 {
            anyhow::bail!("archive.timeout_secs must be > 0");
        }

        match self.storage.backend.as_str() {
            "file" | "memory" => {}
            other => anyhow::bail!(
                "Unknown storage backend: '{}'. Must be file or memory.",
                other
            ),
        }
        if self.storage.quota_bytes == Some(0) {
            anyhow::bail!("storage.quota_bytes must be > 0 when set");
        }

        if self.reader.phase_ms == 0 {
            anyhow::bail!("reader.phase_ms must be > 0");
        }
        if self.gesture.cell_width <= 0.0 {
            anyhow::bail!("gesture.cell_width must be > 0");
        }
        if self.gesture.min_swipe < self.gesture.dead_zone {
            anyhow::bail!("gesture.min_swipe must be >= gesture.dead_zone");
        }

        match self.narration.engine.as_str() {
            "command" if self.narration.command.is_empty() => {
                anyhow::bail!("narration.command must name a program when engine is 'command'")
            }
            "command" | "silent" => {}
            other => anyhow::bail!(
                "Unknown speech engine: '{}'. Must be command or silent.",
                other
            ),
        }
        if !(0.1..=10.0).contains(&self.narration.rate) {
            anyhow::bail!("narration.rate must be in [0.1, 10.0]");
        }
        if self.narration.max_chunk_chars < 20 {
            anyhow::bail!("narration.max_chunk_chars must be >= 20");
        }

        self.logging
            .level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("Unknown logging.level: '{}'", self.logging.level))?;
        Ok(())
    }

    /// Configured directory, else `$XDG_DATA_HOME/nr`, else `~/.local/share/nr`
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.dir {
            return dir.clone();
        }
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("nr");
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local/share/nr"),
            None => PathBuf::from(".nr"),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.logging
            .file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("nr.log"))
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            phase_ms: self.reader.phase_ms,
            notice_ttl_ms: self.reader.notice_ttl_ms,
            double_activation_ms: self.reader.double_activation_ms,
            mark_key: self.reader.mark_key,
            gesture: GestureConfig {
                dead_zone: self.gesture.dead_zone,
                min_swipe: self.gesture.min_swipe,
                fade_distance: self.gesture.fade_distance,
            },
        }
    }

    pub fn narration_config(&self) -> NarrationConfig {
        NarrationConfig {
            locale: self.narration.locale.clone(),
            rate: self.narration.rate,
            max_chunk_chars: self.narration.max_chunk_chars,
            settle_ms: self.narration.settle_ms,
            nudge_interval_ms: Some(self.narration.nudge_interval_ms).filter(|&ms| ms > 0),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            engine: self.narration.engine.clone(),
            command: self.narration.command.clone(),
            words_per_minute: self.narration.words_per_minute,
            voices: self.narration.voices.clone(),
            keep_awake_command: self.narration.keep_awake_command.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reader_config(), ReaderConfig::default());
        assert_eq!(config.narration_config(), NarrationConfig::default());
        assert_eq!(config.gesture.cell_width, 8.0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[archive]
base_url = "https://news.example.org/api/"

[storage]
backend = "memory"

[narration]
engine = "silent"
nudge_interval_ms = 0

[[narration.voices]]
name = "anna"
locale = "de-CH"
default = true
"#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.archive.base_url, "https://news.example.org/api/");
        assert_eq!(config.archive.timeout_secs, 30);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.narration_config().nudge_interval_ms, None);
        assert_eq!(config.engine_config().voices[0].name, "anna");
        assert_eq!(config.reader.mark_key, '*');
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../../../nr.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.reader_config(), ReaderConfig::default());
        assert_eq!(config.narration_config(), NarrationConfig::default());
        assert_eq!(config.narration.voices.len(), 1);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            "[archive]\nbase_url = \"not a url\"",
            "[storage]\nbackend = \"sqlite\"",
            "[narration]\nrate = 0.0",
            "[narration]\nengine = \"command\"\ncommand = []",
            "[gesture]\nmin_swipe = 1.0",
            "[logging]\nlevel = \"loud\"",
        ];
        for case in cases {
            let file = write_config(case);
            assert!(Config::load(Some(file.path())).is_err(), "accepted: {}", case);
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_data_dir_prefers_configured_dir() {
        let config = Config {
            storage: StorageConfig {
                dir: Some(PathBuf::from("/tmp/nr-test")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/nr-test"));
        assert_eq!(config.log_file(), PathBuf::from("/tmp/nr-test/nr.log"));
    }
}
