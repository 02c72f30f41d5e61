pub mod error;
pub mod markdown;
pub mod notice;
pub mod speech;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use notice::{Boundary, Notice};
pub use speech::{
    KeepAwake, SpeechEngine, SpeechErrorKind, SpeechEvent, Utterance, UtteranceId, Voice,
};
pub use storage::KeyValueStore;
pub use types::{local_offset, parse_timestamp, sort_newest_first, Article};

pub mod prelude {
    pub use super::{Article, Error, KeyValueStore, Notice, Result};
}
