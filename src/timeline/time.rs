//! Logical clock value shared by audio and graphics.

use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Position on the intro timeline, nanosecond resolution.
///
/// Record mode derives it exactly from a frame number so every run visits the
/// same instants; live mode derives it from wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeIndex(Duration);

impl TimeIndex {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_secs_f64(seconds: f64) -> Self {
        Self(Duration::from_secs_f64(seconds.max(0.0)))
    }

    /// Start time of frame `frame` at `fps` frames per second
    pub fn from_frame(frame: u64, fps: u32) -> Self {
        let nanos = u128::from(frame) * NANOS_PER_SEC / u128::from(fps.max(1));
        Self(nanos_to_duration(nanos))
    }

    /// Time of audio frame `frame` at `sample_rate`
    pub fn from_audio_frame(frame: u64, sample_rate: u32) -> Self {
        let nanos = u128::from(frame) * NANOS_PER_SEC / u128::from(sample_rate.max(1));
        Self(nanos_to_duration(nanos))
    }

    /// Index of the audio frame that starts at or before this time
    pub fn audio_frame(self, sample_rate: u32) -> u64 {
        (self.0.as_nanos() * u128::from(sample_rate) / NANOS_PER_SEC) as u64
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_secs_f32(self) -> f32 {
        self.0.as_secs_f32()
    }

    pub fn saturating_add(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta))
    }

    pub fn saturating_sub(self, delta: Duration) -> Self {
        Self(self.0.saturating_sub(delta))
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / NANOS_PER_SEC) as u64;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, subsec)
}

impl From<Duration> for TimeIndex {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl fmt::Display for TimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}
