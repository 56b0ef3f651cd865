//! Sequences: groups of fixtures driven together through a pattern.
mod command;
mod scheduler;
mod speed;
mod state;

pub use command::{SequenceCommand, SequenceUpdate};
pub use scheduler::SequenceHandle;
pub use speed::{MAX_FADE_TIME, MAX_SPEED, fade_time, speed_period, static_fade_sample};
pub use state::{SequenceKind, SequenceState, StaticColor};
