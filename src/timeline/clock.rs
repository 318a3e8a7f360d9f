//! Time sources for live playback.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic source of elapsed time.
pub trait TimeSource {
    /// Time elapsed since the source was created
    fn elapsed(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Hand-driven clock for deterministic harnesses.
///
/// Clones share the same reading, so a caller can keep one handle and move
/// the other into a driver.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, elapsed: Duration) {
        self.now.set(elapsed);
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl TimeSource for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}
