pub mod chunk;
pub mod text;
pub mod voice;

pub use chunk::{split_chunks, MAX_CHUNK_CHARS};
pub use text::{narratable_text, strip_markdown};
pub use voice::select_voice;

use nr_core::{KeepAwake, Notice, SpeechEngine, SpeechEvent, Utterance, UtteranceId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub locale: String,
    pub rate: f32,
    pub max_chunk_chars: usize,
    /// Delay between a settled auto-advance and narration of the new article
    pub settle_ms: u64,
    /// Pause/resume nudge while speaking; `None` disables it
    pub nudge_interval_ms: Option<u64>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            locale: "de-CH".to_string(),
            rate: 1.0,
            max_chunk_chars: MAX_CHUNK_CHARS,
            settle_ms: 400,
            nudge_interval_ms: Some(10_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Speaking { article_id: String, chunk_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationProgress {
    /// The next chunk was submitted
    Continuing { chunk_index: usize },
    /// The final chunk completed; narration is idle
    ArticleFinished { article_id: String },
    /// Cancellation, a superseded utterance or a voice-list refresh
    Ignored,
}

/// Drives a speech engine through an article one chunk at a time.
pub struct Narrator<E: SpeechEngine> {
    engine: E,
    config: NarrationConfig,
    keep_awake: Option<Box<dyn KeepAwake>>,
    awake_held: bool,
    state: PlaybackState,
    chunks: Vec<String>,
    utterance: Option<UtteranceId>,
    auto_advance: bool,
    resume_at_ms: Option<u64>,
    next_nudge_ms: Option<u64>,
}

impl<E: SpeechEngine> Narrator<E> {
    pub fn new(engine: E, config: NarrationConfig) -> Self {
        Self {
            engine,
            config,
            keep_awake: None,
            awake_held: false,
            state: PlaybackState::Idle,
            chunks: Vec::new(),
            utterance: None,
            auto_advance: false,
            resume_at_ms: None,
            next_nudge_ms: None,
        }
    }

    pub fn with_keep_awake(mut self, keep_awake: Box<dyn KeepAwake>) -> Self {
        self.keep_awake = Some(keep_awake);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.config
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, PlaybackState::Speaking { .. })
    }

    /// Speaking, or waiting to resume after an auto-advance
    pub fn is_active(&self) -> bool {
        self.is_speaking() || self.auto_advance || self.resume_at_ms.is_some()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Starts narrating `text` at `from_chunk` (restarting from the top when out of range)
    pub fn start(
        &mut self,
        article_id: &str,
        text: &str,
        from_chunk: usize,
        now_ms: u64,
    ) -> Result<(), Notice> {
        self.stop();
        if !self.engine.is_supported() {
            warn!("⚠️ Speech engine {} is not supported here", self.engine.name());
            return Err(Notice::NarrationUnsupported);
        }

        let chunks = split_chunks(text, self.config.max_chunk_chars);
        if chunks.is_empty() {
            debug!("Nothing to narrate for {}", article_id);
            return Ok(());
        }
        let chunk_index = if from_chunk < chunks.len() { from_chunk } else { 0 };
        info!(
            "🔊 Narrating {} from chunk {}/{}",
            article_id,
            chunk_index + 1,
            chunks.len()
        );

        self.chunks = chunks;
        self.state = PlaybackState::Speaking {
            article_id: article_id.to_string(),
            chunk_index,
        };
        if let Some(keep_awake) = self.keep_awake.as_mut() {
            self.awake_held = keep_awake.acquire();
        }
        self.next_nudge_ms = self.config.nudge_interval_ms.map(|every| now_ms + every);
        self.submit(chunk_index)
    }

    /// Cancels all engine output and returns to idle, dropping any pending resume
    pub fn stop(&mut self) {
        self.auto_advance = false;
        self.resume_at_ms = None;
        if self.is_speaking() {
            debug!("Narration stopped");
            self.engine.cancel_all();
        }
        self.go_idle();
    }

    fn go_idle(&mut self) {
        self.state = PlaybackState::Idle;
        self.chunks.clear();
        self.utterance = None;
        self.next_nudge_ms = None;
        if let Some(keep_awake) = self.keep_awake.as_mut() {
            if self.awake_held {
                keep_awake.release();
            }
        }
        self.awake_held = false;
    }

    fn submit(&mut self, chunk_index: usize) -> Result<(), Notice> {
        let Some(text) = self.chunks.get(chunk_index).cloned() else {
            self.go_idle();
            return Ok(());
        };
        let utterance = Utterance {
            text,
            voice: select_voice(&self.engine.voices(), &self.config.locale),
            locale: self.config.locale.clone(),
            rate: self.config.rate,
        };
        match self.engine.speak(utterance) {
            Ok(id) => {
                self.utterance = Some(id);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ Speech engine refused chunk {}: {}", chunk_index, e);
                self.engine.cancel_all();
                self.go_idle();
                Err(Notice::NarrationError(e.to_string()))
            }
        }
    }

    /// Polls one engine event and applies it
    pub fn pump(&mut self) -> Option<Result<NarrationProgress, Notice>> {
        let event = self.engine.poll_event()?;
        Some(self.handle_event(event))
    }

    pub fn handle_event(&mut self, event: SpeechEvent) -> Result<NarrationProgress, Notice> {
        match event {
            SpeechEvent::VoicesChanged => Ok(NarrationProgress::Ignored),
            SpeechEvent::Finished(id) if self.is_current(id) => self.chunk_finished(),
            SpeechEvent::Failed(id, kind) if self.is_current(id) && !kind.is_cancellation() => {
                let message = match kind {
                    nr_core::SpeechErrorKind::Engine(message) => message,
                    other => format!("{:?}", other),
                };
                warn!("⚠️ Narration failed: {}", message);
                self.engine.cancel_all();
                self.go_idle();
                Err(Notice::NarrationError(message))
            }
            _ => Ok(NarrationProgress::Ignored),
        }
    }

    fn is_current(&self, id: UtteranceId) -> bool {
        self.is_speaking() && self.utterance == Some(id)
    }

    fn chunk_finished(&mut self) -> Result<NarrationProgress, Notice> {
        let PlaybackState::Speaking {
            article_id,
            chunk_index,
        } = &mut self.state
        else {
            return Ok(NarrationProgress::Ignored);
        };

        let next = *chunk_index + 1;
        if next < self.chunks.len() {
            *chunk_index = next;
            self.submit(next)?;
            return Ok(NarrationProgress::Continuing { chunk_index: next });
        }

        let article_id = std::mem::take(article_id);
        debug!("Narration of {} finished", article_id);
        self.go_idle();
        Ok(NarrationProgress::ArticleFinished { article_id })
    }

    /// Marks the coming navigation as an auto-advance so narration resumes afterwards
    pub fn arm_auto_advance(&mut self) {
        self.auto_advance = true;
    }

    /// Called when a transition settles; schedules the resume when the transition was
    /// an auto-advance
    pub fn transition_settled(&mut self, now_ms: u64) {
        if std::mem::take(&mut self.auto_advance) {
            self.resume_at_ms = Some(now_ms + self.config.settle_ms);
        }
    }

    /// Drives keep-alive nudges; true when a pending resume is due
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let (true, Some(due)) = (self.is_speaking(), self.next_nudge_ms) {
            if now_ms >= due {
                self.engine.pause();
                self.engine.resume();
                self.next_nudge_ms = self.config.nudge_interval_ms.map(|every| now_ms + every);
            }
        }

        match self.resume_at_ms {
            Some(at) if now_ms >= at => {
                self.resume_at_ms = None;
                true
            }
            _ => false,
        }
    }
}
