use nr_core::Notice;

pub const NOTICE_TTL_MS: u64 = 4_000;

/// Shows one notice at a time; a newer notice replaces the current one.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl_ms: u64,
    current: Option<(Notice, u64)>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(NOTICE_TTL_MS)
    }
}

impl NoticeBoard {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            current: None,
        }
    }

    pub fn post(&mut self, notice: Notice, now_ms: u64) {
        self.current = Some((notice, now_ms + self.ttl_ms));
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref().map(|(notice, _)| notice)
    }

    /// Dismisses an expired notice
    pub fn tick(&mut self, now_ms: u64) {
        if matches!(self.current, Some((_, expires)) if now_ms >= expires) {
            self.current = None;
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
