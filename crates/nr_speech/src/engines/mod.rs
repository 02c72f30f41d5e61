pub mod command;
pub mod silent;

pub use command::{program_exists, CommandEngine};
pub use silent::SilentEngine;
