//! Timeline constants and run duration parameters.

use std::time::Duration;

use super::audio::audio_constants::{BEATS_PER_BAR, TEMPO_BPM, TRACK_BARS};
use crate::error::ConfigError;

/// Declared output frame rate (frames per second)
pub const FRAME_RATE: u32 = 60;

/// Length of the authored content: 32 bars of 4/4 at 120 BPM = 64 s
pub const TRACK_DURATION: Duration =
    Duration::from_secs((TRACK_BARS * BEATS_PER_BAR * 60 / TEMPO_BPM) as u64);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Timeline parameters
#[derive(Debug, Clone)]
pub struct TimelineParams {
    /// Frame rate used for the fixed record-mode step (FPS)
    pub frame_rate: u32,

    /// Requested run length; `None` plays the whole track
    pub requested_duration: Option<Duration>,
}

impl Default for TimelineParams {
    fn default() -> Self {
        Self {
            frame_rate: FRAME_RATE,
            requested_duration: None,
        }
    }
}

impl TimelineParams {
    /// Parameters for a run that stops after `seconds`
    ///
    /// Requests past the track are clamped before conversion, and the result
    /// is rounded to whole nanoseconds so decimal inputs like `0.1` stay exact.
    pub fn with_duration_secs(seconds: f64) -> Result<Self, ConfigError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::InvalidDuration(seconds));
        }
        let clamped = seconds.min(TRACK_DURATION.as_secs_f64());
        let nanos = (clamped * NANOS_PER_SEC as f64).round() as u64;
        if nanos == 0 {
            return Err(ConfigError::InvalidDuration(seconds));
        }
        Ok(Self {
            requested_duration: Some(Duration::from_nanos(nanos)),
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidFrameRate(self.frame_rate));
        }
        if self.requested_duration == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidDuration(0.0));
        }
        Ok(())
    }

    /// Run length clamped to the authored content
    pub fn effective_duration(&self, authored: Duration) -> Duration {
        self.requested_duration
            .map_or(authored, |requested| requested.min(authored))
    }

    /// Number of frames needed to cover `duration`: ceil(duration * fps)
    pub fn frame_count(&self, duration: Duration) -> u64 {
        let scaled = duration.as_nanos() * u128::from(self.frame_rate);
        scaled.div_ceil(NANOS_PER_SEC) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_duration_matches_arrangement() {
        assert_eq!(TRACK_DURATION, Duration::from_secs(64));
    }

    #[test]
    fn frame_count_rounds_up() {
        let params = TimelineParams::default();
        assert_eq!(params.frame_count(TRACK_DURATION), 64 * 60);
        assert_eq!(params.frame_count(Duration::from_millis(1)), 1);
        assert_eq!(params.frame_count(Duration::from_millis(1001)), 61);
        assert_eq!(params.frame_count(Duration::ZERO), 0);
    }

    #[test]
    fn requested_duration_is_clamped() {
        let params = TimelineParams {
            requested_duration: Some(Duration::from_secs(600)),
            ..TimelineParams::default()
        };
        assert_eq!(params.effective_duration(TRACK_DURATION), TRACK_DURATION);

        let params = TimelineParams::with_duration_secs(2.5).unwrap();
        assert_eq!(
            params.effective_duration(TRACK_DURATION),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn rejects_non_positive_durations() {
        assert!(TimelineParams::with_duration_secs(0.0).is_err());
        assert!(TimelineParams::with_duration_secs(-3.0).is_err());
        assert!(TimelineParams::with_duration_secs(f64::NAN).is_err());
        assert!(TimelineParams::with_duration_secs(f64::INFINITY).is_err());
        assert!(TimelineParams::with_duration_secs(1e-12).is_err());
    }

    #[test]
    fn huge_durations_clamp_to_the_track() {
        for seconds in [1e30, f64::MAX, 64.5] {
            let params = TimelineParams::with_duration_secs(seconds).unwrap();
            assert_eq!(params.requested_duration, Some(TRACK_DURATION));
            assert_eq!(params.frame_count(TRACK_DURATION), 64 * 60);
        }
    }

    #[test]
    fn decimal_durations_are_exact() {
        let params = TimelineParams::with_duration_secs(0.1).unwrap();
        assert_eq!(params.requested_duration, Some(Duration::from_millis(100)));
        assert_eq!(params.frame_count(Duration::from_millis(100)), 6);

        let params = TimelineParams::with_duration_secs(0.7).unwrap();
        assert_eq!(params.requested_duration, Some(Duration::from_millis(700)));
        assert_eq!(params.frame_count(Duration::from_millis(700)), 42);
    }
}
