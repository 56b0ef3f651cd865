//! Time sources for the workers.
//!
//! Schedulers, fades and chases never sleep directly; they ask a clock for a
//! timer channel and select on it alongside their inbox. Tests swap in a
//! manually advanced clock to get deterministic output.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, after};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// A channel that receives one message once the duration has elapsed.
    fn after(&self, duration: Duration) -> Receiver<Instant>;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn after(&self, duration: Duration) -> Receiver<Instant> {
        after(duration)
    }
}
