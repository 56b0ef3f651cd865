//! Pattern templates, fade envelopes and the generator that combines them.
mod fade;
mod generator;
mod template;

pub use fade::{FadeProfile, MAX_FADE, MAX_SIZE};
pub use generator::{GeneratorParams, Position, Steps, chaser_steps, generate};
pub use template::{PatternName, SCANNER_STEPS, Template};
