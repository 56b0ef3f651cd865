//! Speed and fade-time tables.
use std::time::Duration;

const SPEED_MS: [u64; 21] = [
    3500, 3000, 2500, 1800, 1500, 1000, 750, 500, 250, 150, 125, 100, 75, 50, 25, 20, 15, 10, 7, 5,
    3,
];

const FADE_TIME_MS: [u64; 13] = [1000, 900, 800, 700, 600, 500, 400, 300, 200, 150, 100, 50, 25];

/// Fastest speed ordinal.
pub const MAX_SPEED: usize = SPEED_MS.len() - 1;

/// Fastest fade-time ordinal.
pub const MAX_FADE_TIME: usize = FADE_TIME_MS.len() - 1;

/// Step period for a speed ordinal. Out of range ordinals clamp to the fastest.
pub fn speed_period(speed: usize) -> Duration {
    Duration::from_millis(SPEED_MS[speed.min(MAX_SPEED)])
}

/// Duration of a fade ramp for a fade-time ordinal.
pub fn fade_time(ordinal: usize) -> Duration {
    Duration::from_millis(FADE_TIME_MS[ordinal.min(MAX_FADE_TIME)])
}

/// Interval between samples of a static fade at a sequence's RGB fade speed.
pub fn static_fade_sample(rgb_fade: usize) -> Duration {
    Duration::from_millis(5 * rgb_fade.max(1) as u64)
}
