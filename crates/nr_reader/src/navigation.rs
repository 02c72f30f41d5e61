use nr_core::Boundary;
use tracing::debug;

/// Default length of each animation phase.
pub const PHASE_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Exiting,
    Entering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Animating {
        direction: Direction,
        phase: Phase,
        started_ms: u64,
        /// Keep the index on exit; the current article drops out of the sequence
        hold: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    /// The outgoing card has left; the caller recomputes the sequence and calls `advance`
    ExitCompleted { direction: Direction, hold: bool },
    /// The incoming card is in place
    Settled,
}

/// Position over the filtered sequence plus the two-phase slide animation.
#[derive(Debug, Clone)]
pub struct Navigator {
    index: Option<usize>,
    state: NavState,
    phase_ms: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(PHASE_MS)
    }
}

impl Navigator {
    pub fn new(phase_ms: u64) -> Self {
        Self {
            index: None,
            state: NavState::Idle,
            phase_ms,
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.state != NavState::Idle
    }

    /// Whether a move is possible from the current position in a sequence of `len`
    pub fn check(&self, direction: Direction, len: usize) -> Result<(), Boundary> {
        match (direction, self.index) {
            (Direction::Forward, Some(i)) if i + 1 < len => Ok(()),
            (Direction::Forward, _) => Err(Boundary::End),
            (Direction::Backward, Some(i)) if i > 0 && len > 0 => Ok(()),
            (Direction::Backward, _) => Err(Boundary::Start),
        }
    }

    pub fn begin(&mut self, direction: Direction, hold: bool, now_ms: u64) {
        debug!("Navigation {:?} started (hold: {})", direction, hold);
        self.state = NavState::Animating {
            direction,
            phase: Phase::Exiting,
            started_ms: now_ms,
            hold,
        };
    }

    /// Advances the animation; call repeatedly until it returns `None`
    pub fn tick(&mut self, now_ms: u64) -> Option<NavEvent> {
        let NavState::Animating {
            direction,
            phase,
            started_ms,
            hold,
        } = self.state
        else {
            return None;
        };
        if now_ms.saturating_sub(started_ms) < self.phase_ms {
            return None;
        }

        match phase {
            Phase::Exiting => {
                self.state = NavState::Animating {
                    direction,
                    phase: Phase::Entering,
                    started_ms: started_ms + self.phase_ms,
                    hold,
                };
                Some(NavEvent::ExitCompleted { direction, hold })
            }
            Phase::Entering => {
                self.state = NavState::Idle;
                Some(NavEvent::Settled)
            }
        }
    }

    /// Applies the index change of a completed exit over the recomputed sequence
    pub fn advance(&mut self, direction: Direction, hold: bool, len: usize) {
        self.index = match (direction, self.index) {
            (Direction::Forward, Some(i)) if hold => Some(i),
            (Direction::Forward, Some(i)) => Some(i + 1),
            (Direction::Backward, Some(i)) => Some(i.saturating_sub(1)),
            (_, None) => Some(0),
        };
        self.clamp(len);
    }

    /// Re-clamps into `[0, len - 1]`, or `None` when the sequence is empty
    pub fn clamp(&mut self, len: usize) {
        self.index = match self.index {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
    }

    pub fn set_index(&mut self, index: usize, len: usize) {
        self.index = Some(index);
        self.clamp(len);
    }

    /// Drops any animation in flight
    pub fn reset(&mut self) {
        self.state = NavState::Idle;
    }

    /// Fraction of the current phase that has elapsed
    pub fn progress(&self, now_ms: u64) -> Option<(Direction, Phase, f32)> {
        match self.state {
            NavState::Idle => None,
            NavState::Animating {
                direction,
                phase,
                started_ms,
                ..
            } => {
                let elapsed = now_ms.saturating_sub(started_ms) as f32;
                let fraction = if self.phase_ms == 0 {
                    1.0
                } else {
                    (elapsed / self.phase_ms as f32).min(1.0)
                };
                Some((direction, phase, fraction))
            }
        }
    }
}
