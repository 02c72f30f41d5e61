use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Displacement below this shows no movement
    pub dead_zone: f32,
    /// Displacement needed on release to turn the page
    pub min_swipe: f32,
    /// Offset at which the card is fully faded out
    pub fade_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            dead_zone: 10.0,
            min_swipe: 50.0,
            fade_distance: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragVisual {
    pub offset: f32,
    pub opacity: f32,
}

impl DragVisual {
    pub const CENTERED: DragVisual = DragVisual {
        offset: 0.0,
        opacity: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    Next,
    Previous,
    SnapBack,
    /// Released inside the dead zone
    Tap,
}

/// Horizontal drag decoding for the article card.
#[derive(Debug, Clone)]
pub struct DragTracker {
    config: GestureConfig,
    origin: Option<f32>,
    displacement: f32,
}

impl DragTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            origin: None,
            displacement: 0.0,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    pub fn press(&mut self, x: f32) {
        self.origin = Some(x);
        self.displacement = 0.0;
    }

    pub fn motion(&mut self, x: f32) -> DragVisual {
        let Some(origin) = self.origin else {
            return DragVisual::CENTERED;
        };
        self.displacement = x - origin;
        self.visual()
    }

    pub fn visual(&self) -> DragVisual {
        if self.origin.is_none() || self.displacement.abs() < self.config.dead_zone {
            return DragVisual::CENTERED;
        }
        let offset = (self.displacement.abs() - self.config.dead_zone) * self.displacement.signum();
        let opacity = if self.config.fade_distance > 0.0 {
            (1.0 - offset.abs() / self.config.fade_distance).max(0.0)
        } else {
            0.0
        };
        DragVisual { offset, opacity }
    }

    /// Ends the drag. A release without a press snaps back.
    pub fn release(&mut self, x: f32) -> SwipeOutcome {
        let Some(origin) = self.origin.take() else {
            return SwipeOutcome::SnapBack;
        };
        let displacement = x - origin;
        self.displacement = 0.0;
        if displacement.abs() < self.config.dead_zone {
            SwipeOutcome::Tap
        } else if displacement < -self.config.min_swipe {
            SwipeOutcome::Next
        } else if displacement > self.config.min_swipe {
            SwipeOutcome::Previous
        } else {
            SwipeOutcome::SnapBack
        }
    }

    pub fn cancel(&mut self) {
        self.origin = None;
        self.displacement = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_zone_hides_movement() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(100.0);
        assert_eq!(drag.motion(95.0), DragVisual::CENTERED);
        let visual = drag.motion(40.0);
        assert_eq!(visual.offset, -50.0);
        assert!((visual.opacity - 250.0 / 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_starts_at_dead_zone_edge() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(100.0);
        assert_eq!(drag.motion(110.0).offset, 0.0);
        assert_eq!(drag.motion(125.0).offset, 15.0);
        assert_eq!(drag.motion(75.0).offset, -15.0);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(0.0);
        assert_eq!(drag.motion(900.0).opacity, 0.0);
    }

    #[test]
    fn test_release_outcomes() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(200.0);
        assert_eq!(drag.release(120.0), SwipeOutcome::Next);
        drag.press(200.0);
        assert_eq!(drag.release(260.0), SwipeOutcome::Previous);
        drag.press(200.0);
        assert_eq!(drag.release(160.0), SwipeOutcome::SnapBack);
        assert_eq!(drag.release(0.0), SwipeOutcome::SnapBack);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_exact_threshold_snaps_back() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(100.0);
        assert_eq!(drag.release(50.0), SwipeOutcome::SnapBack);
    }

    #[test]
    fn test_release_inside_dead_zone_is_a_tap() {
        let mut drag = DragTracker::new(GestureConfig::default());
        drag.press(100.0);
        assert_eq!(drag.release(100.0), SwipeOutcome::Tap);
        drag.press(100.0);
        drag.motion(30.0);
        assert_eq!(drag.release(95.0), SwipeOutcome::Tap);
        drag.press(100.0);
        assert_eq!(drag.release(88.0), SwipeOutcome::SnapBack);
    }
}
