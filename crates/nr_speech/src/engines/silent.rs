use nr_core::{Result, SpeechEngine, SpeechErrorKind, SpeechEvent, Utterance, UtteranceId, Voice};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Shortest time any utterance takes
const MIN_UTTERANCE_MS: u64 = 150;

/// Produces no sound; finishes each utterance after the time it would have taken
/// to read aloud at `words_per_minute`.
pub struct SilentEngine {
    words_per_minute: u32,
    voices: Vec<Voice>,
    active: Option<(UtteranceId, Instant)>,
    paused_at: Option<Instant>,
    queue: VecDeque<(UtteranceId, Duration)>,
    events: VecDeque<SpeechEvent>,
    next_id: UtteranceId,
}

impl fmt::Debug for SilentEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilentEngine")
            .field("words_per_minute", &self.words_per_minute)
            .finish()
    }
}

impl SilentEngine {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            voices: Vec::new(),
            active: None,
            paused_at: None,
            queue: VecDeque::new(),
            events: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    pub fn utterance_duration(&self, text: &str, rate: f32) -> Duration {
        let words = text.split_whitespace().count() as f64;
        let rate = if rate > 0.0 { rate as f64 } else { 1.0 };
        let ms = words * 60_000.0 / (self.words_per_minute as f64 * rate);
        Duration::from_millis((ms.round() as u64).max(MIN_UTTERANCE_MS))
    }

    fn speak_at(&mut self, utterance: Utterance, now: Instant) -> UtteranceId {
        self.next_id += 1;
        let id = self.next_id;
        let duration = self.utterance_duration(&utterance.text, utterance.rate);
        if self.active.is_some() {
            self.queue.push_back((id, duration));
        } else {
            self.active = Some((id, now + duration));
        }
        id
    }

    fn poll_at(&mut self, now: Instant) -> Option<SpeechEvent> {
        if self.paused_at.is_none() {
            if let Some((id, deadline)) = self.active {
                if now >= deadline {
                    self.events.push_back(SpeechEvent::Finished(id));
                    self.active = self
                        .queue
                        .pop_front()
                        .map(|(next, duration)| (next, deadline + duration));
                }
            }
        }
        self.events.pop_front()
    }

    fn pause_at(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    fn resume_at(&mut self, now: Instant) {
        if let Some(paused) = self.paused_at.take() {
            if let Some((_, deadline)) = self.active.as_mut() {
                *deadline += now.saturating_duration_since(paused);
            }
        }
    }
}

impl SpeechEngine for SilentEngine {
    fn name(&self) -> &str {
        "silent"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<UtteranceId> {
        Ok(self.speak_at(utterance, Instant::now()))
    }

    fn cancel_all(&mut self) {
        if let Some((id, _)) = self.active.take() {
            self.events
                .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Canceled));
        }
        for (id, _) in self.queue.drain(..) {
            self.events
                .push_back(SpeechEvent::Failed(id, SpeechErrorKind::Canceled));
        }
        self.paused_at = None;
    }

    fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    fn poll_event(&mut self) -> Option<SpeechEvent> {
        self.poll_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(text: &str) -> Utterance {
        Utterance {
            text: text.to_string(),
            voice: None,
            locale: "de-CH".to_string(),
            rate: 1.0,
        }
    }

    #[test]
    fn test_duration_follows_word_count_and_rate() {
        let engine = SilentEngine::new(120);
        assert_eq!(
            engine.utterance_duration("eins zwei drei vier", 1.0),
            Duration::from_millis(2000)
        );
        assert_eq!(
            engine.utterance_duration("eins zwei drei vier", 2.0),
            Duration::from_millis(1000)
        );
        assert_eq!(
            engine.utterance_duration("", 1.0),
            Duration::from_millis(MIN_UTTERANCE_MS)
        );
    }

    #[test]
    fn test_finishes_in_order() {
        let mut engine = SilentEngine::new(60);
        let start = Instant::now();
        let first = engine.speak_at(utterance("eins zwei"), start);
        let second = engine.speak_at(utterance("drei"), start);

        assert_eq!(engine.poll_at(start + Duration::from_millis(1999)), None);
        assert_eq!(
            engine.poll_at(start + Duration::from_secs(2)),
            Some(SpeechEvent::Finished(first))
        );
        assert_eq!(engine.poll_at(start + Duration::from_millis(2500)), None);
        assert_eq!(
            engine.poll_at(start + Duration::from_secs(3)),
            Some(SpeechEvent::Finished(second))
        );
    }

    #[test]
    fn test_pause_shifts_deadline() {
        let mut engine = SilentEngine::new(60);
        let start = Instant::now();
        let id = engine.speak_at(utterance("eins"), start);

        engine.pause_at(start + Duration::from_millis(500));
        assert_eq!(engine.poll_at(start + Duration::from_secs(5)), None);
        engine.resume_at(start + Duration::from_millis(1500));

        assert_eq!(engine.poll_at(start + Duration::from_millis(1999)), None);
        assert_eq!(
            engine.poll_at(start + Duration::from_secs(2)),
            Some(SpeechEvent::Finished(id))
        );
    }

    #[test]
    fn test_cancel_reports_every_utterance() {
        let mut engine = SilentEngine::new(60);
        let start = Instant::now();
        let first = engine.speak_at(utterance("eins"), start);
        let second = engine.speak_at(utterance("zwei"), start);
        engine.cancel_all();

        assert_eq!(
            engine.poll_at(start),
            Some(SpeechEvent::Failed(first, SpeechErrorKind::Canceled))
        );
        assert_eq!(
            engine.poll_at(start),
            Some(SpeechEvent::Failed(second, SpeechErrorKind::Canceled))
        );
        assert_eq!(engine.poll_at(start + Duration::from_secs(10)), None);
    }
}
