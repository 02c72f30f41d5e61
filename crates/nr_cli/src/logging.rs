use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

/// Installs the global fmt subscriber. With `file` set, output is appended there instead
/// of stderr so the interactive screen is not overwritten.
pub fn init(config: &LoggingConfig, file: Option<&Path>) -> Result<()> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown logging.level: '{}'", config.level))?;

    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);
    let installed = match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(log)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}
