use crate::Result;

pub type UtteranceId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub name: String,
    /// BCP 47 style tag, e.g. `de-CH`
    pub locale: String,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` leaves the choice to the engine
    pub voice: Option<Voice>,
    pub locale: String,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Output was dropped because `cancel_all` was called
    Canceled,
    /// Output was cut short by a newer utterance
    Interrupted,
    Engine(String),
}

impl SpeechErrorKind {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SpeechErrorKind::Canceled | SpeechErrorKind::Interrupted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Finished(UtteranceId),
    Failed(UtteranceId, SpeechErrorKind),
    /// The voice list changed; engines may populate it after start-up
    VoicesChanged,
}

/// Speech engine capability contract. Completion and error callbacks are delivered
/// through `poll_event`, which the owner calls from its control loop.
pub trait SpeechEngine {
    fn name(&self) -> &str;

    /// False when the platform cannot speak at all
    fn is_supported(&self) -> bool;

    /// Voices known so far; may be empty until the engine has populated them
    fn voices(&self) -> Vec<Voice>;

    /// Submit one utterance for output
    fn speak(&mut self, utterance: Utterance) -> Result<UtteranceId>;

    /// Drop all pending and active output
    fn cancel_all(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Next completion/error notification, if any
    fn poll_event(&mut self) -> Option<SpeechEvent>;
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<UtteranceId> {
        (**self).speak(utterance)
    }

    fn cancel_all(&mut self) {
        (**self).cancel_all()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn poll_event(&mut self) -> Option<SpeechEvent> {
        (**self).poll_event()
    }
}

/// Platform resource that keeps the device awake while narration runs.
pub trait KeepAwake {
    /// Try to take the resource; false when the platform refused
    fn acquire(&mut self) -> bool;

    fn release(&mut self);
}
