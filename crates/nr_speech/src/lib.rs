pub mod engines;
pub mod keep_awake;

use nr_core::{Error, KeepAwake, Result, SpeechEngine, Voice};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use engines::{program_exists, CommandEngine, SilentEngine};
pub use keep_awake::{CommandKeepAwake, NoKeepAwake};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceEntry {
    pub name: String,
    pub locale: String,
    #[serde(default)]
    pub default: bool,
}

impl From<&VoiceEntry> for Voice {
    fn from(entry: &VoiceEntry) -> Self {
        Voice {
            name: entry.name.clone(),
            locale: entry.locale.clone(),
            default: entry.default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `command` or `silent`
    pub engine: String,
    /// Program and argument template for the `command` engine
    pub command: Vec<String>,
    pub words_per_minute: u32,
    /// Voices the engine offers; command-line programs cannot be asked for them
    pub voices: Vec<VoiceEntry>,
    /// Inhibitor process held while narration runs
    pub keep_awake_command: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: "command".to_string(),
            command: vec![
                "espeak-ng".to_string(),
                "-v".to_string(),
                "{voice}".to_string(),
                "-s".to_string(),
                "{wpm}".to_string(),
            ],
            words_per_minute: 175,
            voices: Vec::new(),
            keep_awake_command: Vec::new(),
        }
    }
}

pub fn create_engine(config: &EngineConfig) -> Result<Box<dyn SpeechEngine>> {
    let voices: Vec<Voice> = config.voices.iter().map(Voice::from).collect();
    let engine: Box<dyn SpeechEngine> = match config.engine.to_lowercase().as_str() {
        "command" => {
            let (program, args) = config.command.split_first().ok_or_else(|| {
                Error::Config("narration.command must name a program".to_string())
            })?;
            Box::new(
                CommandEngine::new(program.clone(), args.to_vec())
                    .with_voices(voices)
                    .with_words_per_minute(config.words_per_minute),
            )
        }
        "silent" => Box::new(SilentEngine::new(config.words_per_minute).with_voices(voices)),
        other => {
            return Err(Error::Config(format!(
                "Unknown speech engine: '{}'. Available: command, silent",
                other
            )))
        }
    };
    info!(
        "🔊 Speech engine {} ready (supported: {})",
        engine.name(),
        engine.is_supported()
    );
    Ok(engine)
}

pub fn create_keep_awake(config: &EngineConfig) -> Box<dyn KeepAwake> {
    match CommandKeepAwake::from_command(&config.keep_awake_command) {
        Some(awake) => Box::new(awake),
        None => Box::new(NoKeepAwake),
    }
}

pub mod prelude {
    pub use super::{create_engine, create_keep_awake, EngineConfig};
    pub use nr_core::{KeepAwake, SpeechEngine};
}
