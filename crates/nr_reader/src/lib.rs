pub mod gesture;
pub mod input;
pub mod narration;
pub mod navigation;
pub mod notices;
pub mod reader;
pub mod session;


pub use gesture::{DragTracker, DragVisual, GestureConfig, SwipeOutcome};
pub use input::{Command, DoubleActivation, Key, KeyBindings};
pub use narration::{NarrationConfig, NarrationProgress, Narrator, PlaybackState};
pub use navigation::{Direction, NavState, Navigator, Phase};
pub use notices::NoticeBoard;
pub use reader::{CommandOutcome, DateStep, DeleteOutcome, Reader, ReaderConfig};
pub use session::{CategoryFilter, DateFilter, SessionFilter};

pub mod prelude {
    pub use super::{Command, Key, Reader, ReaderConfig};
    pub use nr_core::{Article, Notice, SpeechEngine};
}
