/// Activations closer together than this count as a double activation.
pub const DOUBLE_ACTIVATION_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Space,
    Enter,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    ToggleSaved,
    Delete,
    ToggleNarration,
    JumpToNewest,
    ToggleHideRead,
    CycleCategory,
    /// Older day
    PreviousDate,
    /// Newer day
    NextDate,
    ResetRead,
    Activate,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub mark_key: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self { mark_key: '*' }
    }
}

impl KeyBindings {
    pub fn command(&self, key: Key) -> Option<Command> {
        let command = match key {
            Key::Right | Key::Space => Command::Next,
            Key::Left => Command::Previous,
            Key::Enter => Command::Activate,
            Key::Escape => Command::Quit,
            Key::Char(c) if c == self.mark_key => Command::ToggleSaved,
            Key::Char(c) => match c.to_ascii_lowercase() {
                'd' => Command::Delete,
                'a' => Command::ToggleNarration,
                'n' => Command::JumpToNewest,
                'h' => Command::ToggleHideRead,
                'c' => Command::CycleCategory,
                '[' => Command::PreviousDate,
                ']' => Command::NextDate,
                'r' => Command::ResetRead,
                'q' => Command::Quit,
                ' ' => Command::Next,
                _ => return None,
            },
        };
        Some(command)
    }
}

/// Detects two activations within a short window.
#[derive(Debug, Clone)]
pub struct DoubleActivation {
    window_ms: u64,
    last_ms: Option<u64>,
}

impl Default for DoubleActivation {
    fn default() -> Self {
        Self::new(DOUBLE_ACTIVATION_MS)
    }
}

impl DoubleActivation {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_ms: None,
        }
    }

    /// Records an activation; true when it completes a double activation
    pub fn register(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) <= self.window_ms => {
                self.last_ms = None;
                true
            }
            _ => {
                self.last_ms = Some(now_ms);
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
