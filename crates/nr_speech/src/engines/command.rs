use nr_core::{Error, Result, SpeechEngine, SpeechErrorKind, SpeechEvent, Utterance, UtteranceId, Voice};
use std::collections::VecDeque;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Speaks by running an external text-to-speech program once per utterance.
///
/// Arguments may contain `{text}`, `{voice}`, `{locale}`, `{rate}` and `{wpm}`; when no
/// argument mentions `{text}` the text is appended as the last argument. Completion is
/// detected by polling the child. Child processes cannot be paused portably, so `pause`
/// and `resume` only record the request.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    voices: Vec<Voice>,
    words_per_minute: u32,
    active: Option<(UtteranceId, Child)>,
    queue: VecDeque<(UtteranceId, Utterance)>,
    events: VecDeque<SpeechEvent>,
    next_id: UtteranceId,
    paused: bool,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            voices: Vec::new(),
            words_per_minute: 175,
            active: None,
            queue: VecDeque::new(),
            events: VecDeque::new(),
            next_id: 0,
            paused: false,
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_words_per_minute(mut self, words_per_minute: u32) -> Self {
        self.words_per_minute = words_per_minute;
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn expand_args(&self, utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .voice
            .as_ref()
            .map_or(utterance.locale.as_str(), |v| v.name.as_str());
        let wpm = (self.words_per_minute as f32 * utterance.rate).round() as u32;

        let mut has_text = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                has_text |= arg.contains("{text}");
                arg.replace("{text}", &utterance.text)
                    .replace("{voice}", voice)
                    .replace("{locale}", &utterance.locale)
                    .replace("{rate}", &format!("{:.2}", utterance.rate))
                    .replace("{wpm}", &wpm.to_string())
            })
            .collect();
        if !has_text {
            args.push(utterance.text.clone());
        }
        args
    }

    fn spawn(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.expand_args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", self.program, e))))?;
        debug!("Speaking utterance {} with {}", id, self.program);
        self.active = Some((id, child));
        Ok(())
    }

    fn reap(&mut self) {
        let Some((id, child)) = self.active.as_mut() else {
            return;
        };
        let id = *id;
        match child.try_wait() {
            Ok(None) => return,
            Ok(Some(status)) if status.success() => self.events.push_back(SpeechEvent::Finished(id)),
            Ok(Some(status)) => self.events.push_back(SpeechEvent::Failed(
                id,
                SpeechErrorKind::Engine(format!("{} exited with {}", self.program, status)),
            )),
            Err(e) => self
                .events
                .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Engine(e.to_string()))),
        }
        self.active = None;

        while let Some((id, utterance)) = self.queue.pop_front() {
            match self.spawn(id, &utterance) {
                Ok(()) => break,
                Err(e) => self
                    .events
                    .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Engine(e.to_string()))),
            }
        }
    }

    fn kill_active(&mut self) {
        if let Some((id, mut child)) = self.active.take() {
            if let Err(e) = child.kill() {
                debug!("Child for utterance {} already gone: {}", id, e);
            }
            let _ = child.wait();
            self.events
                .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Canceled));
        }
    }
}

impl SpeechEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_supported(&self) -> bool {
        program_exists(&self.program)
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<UtteranceId> {
        self.next_id += 1;
        let id = self.next_id;
        if self.active.is_some() {
            self.queue.push_back((id, utterance));
        } else {
            self.spawn(id, &utterance)?;
        }
        Ok(id)
    }

    fn cancel_all(&mut self) {
        self.kill_active();
        for (id, _) in self.queue.drain(..) {
            self.events
                .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Canceled));
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn poll_event(&mut self) -> Option<SpeechEvent> {
        self.reap();
        self.events.pop_front()
    }
}

impl Drop for CommandEngine {
    fn drop(&mut self) {
        if self.active.is_some() {
            warn!("⚠️ Stopping speech command on shutdown");
            self.kill_active();
        }
    }
}

/// True when `program` is a path to an existing file or is found on `PATH`
pub fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn utterance(text: &str) -> Utterance {
        Utterance {
            text: text.to_string(),
            voice: None,
            locale: "de-CH".to_string(),
            rate: 1.5,
        }
    }

    fn wait_for_event(engine: &mut CommandEngine) -> Option<SpeechEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(event) = engine.poll_event() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_argument_template() {
        let engine = CommandEngine::new(
            "say",
            vec!["-v".to_string(), "{voice}".to_string(), "-r".to_string(), "{wpm}".to_string()],
        )
        .with_words_per_minute(200);
        assert_eq!(
            engine.expand_args(&utterance("Grüezi")),
            vec!["-v", "de-CH", "-r", "300", "Grüezi"]
        );

        let engine = CommandEngine::new("tts", vec!["--text={text}".to_string(), "{rate}".to_string()]);
        let mut u = utterance("Hallo");
        u.voice = Some(Voice {
            name: "leni".to_string(),
            locale: "de-CH".to_string(),
            default: false,
        });
        assert_eq!(engine.expand_args(&u), vec!["--text=Hallo", "1.50"]);
    }

    #[test]
    fn test_missing_program_is_unsupported() {
        let engine = CommandEngine::new("definitely-not-a-tts-program-4711", Vec::new());
        assert!(!engine.is_supported());
    }

    #[cfg(unix)]
    #[test]
    fn test_completion_and_failure_events() {
        let mut engine = CommandEngine::new("true", Vec::new());
        let id = engine.speak(utterance("eins")).unwrap();
        assert_eq!(wait_for_event(&mut engine), Some(SpeechEvent::Finished(id)));

        let mut engine = CommandEngine::new("false", Vec::new());
        let id = engine.speak(utterance("zwei")).unwrap();
        assert!(matches!(
            wait_for_event(&mut engine),
            Some(SpeechEvent::Failed(failed, SpeechErrorKind::Engine(_))) if failed == id
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_child() {
        let mut engine = CommandEngine::new("sleep", vec!["5".to_string()]);
        let first = engine.speak(utterance("5")).unwrap();
        let second = engine.speak(utterance("5")).unwrap();
        engine.cancel_all();
        assert_eq!(
            engine.poll_event(),
            Some(SpeechEvent::Failed(first, SpeechErrorKind::Canceled))
        );
        assert_eq!(
            engine.poll_event(),
            Some(SpeechEvent::Failed(second, SpeechErrorKind::Canceled))
        );
        assert_eq!(engine.poll_event(), None);
    }
}
