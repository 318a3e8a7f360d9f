//! Audio format, arrangement and analysis configuration.

use std::ops::Range;

use crate::error::ConfigError;

/// Audio constants (compile-time, shared by synthesis, streaming and capture)
pub mod audio_constants {
    /// Output sample rate (Hz)
    pub const SAMPLE_RATE: u32 = 44_100;

    /// Interleaved channel count (stereo)
    pub const CHANNELS: u16 = 2;

    /// Frames synthesized per streaming block
    /// 512 frames = 11.6ms @ 44.1kHz
    pub const BLOCK_SIZE: usize = 512;

    /// Live ring buffer capacity in samples
    /// ~150ms at 44.1kHz = 6615 frames * 2 channels
    pub const RING_BUFFER_SAMPLES: usize = 13_230;

    /// Tempo of the authored track (beats per minute)
    pub const TEMPO_BPM: u32 = 120;

    /// Beats per bar (4/4)
    pub const BEATS_PER_BAR: u32 = 4;

    /// Length of the authored track (bars)
    pub const TRACK_BARS: u32 = 32;
}

/// FFT analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct FFTConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size in frames (must be power of 2)
    pub fft_size: usize,

    /// Bass frequency range (Hz)
    pub bass_range_hz: (f32, f32),

    /// Mid frequency range (Hz)
    pub mid_range_hz: (f32, f32),

    /// High frequency range (Hz)
    pub high_range_hz: (f32, f32),
}

impl Default for FFTConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: audio_constants::SAMPLE_RATE as usize,
            fft_size: 1024,
            bass_range_hz: (20.0, 200.0),
            mid_range_hz: (200.0, 1000.0),
            high_range_hz: (1000.0, 8000.0),
        }
    }
}

impl FFTConfig {
    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// Get FFT bin range for bass frequencies
    pub fn bass_bins(&self) -> Range<usize> {
        self.bins(self.bass_range_hz)
    }

    /// Get FFT bin range for mid frequencies
    pub fn mid_bins(&self) -> Range<usize> {
        self.bins(self.mid_range_hz)
    }

    /// Get FFT bin range for high frequencies
    pub fn high_bins(&self) -> Range<usize> {
        self.bins(self.high_range_hz)
    }

    fn bins(&self, (low, high): (f32, f32)) -> Range<usize> {
        self.hz_to_bin(low)..self.hz_to_bin(high)
    }

    /// Validate configuration (FFT size must be power of 2, bands non-empty)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() {
            return Err(ConfigError::Analysis(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Analysis("sample rate must be > 0".to_string()));
        }
        let nyquist = self.fft_size / 2;
        for (name, bins) in [
            ("bass", self.bass_bins()),
            ("mid", self.mid_bins()),
            ("high", self.high_bins()),
        ] {
            if bins.is_empty() || bins.end > nyquist {
                return Err(ConfigError::Analysis(format!(
                    "{name} band maps to invalid bin range {bins:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_config_hz_to_bin() {
        let config = FFTConfig::default();

        // 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(43.07), 1);
        assert_eq!(config.hz_to_bin(100.0), 2);
    }

    #[test]
    fn test_fft_config_band_ranges() {
        let config = FFTConfig::default();
        config.validate().unwrap();

        let bass = config.bass_bins();
        let mid = config.mid_bins();
        let high = config.high_bins();

        assert!(mid.start >= bass.end);
        assert!(high.start >= mid.end);
        assert!(high.end <= config.fft_size / 2);
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        let config = FFTConfig {
            fft_size: 1000,
            ..FFTConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FFTConfig {
            high_range_hz: (1000.0, 40_000.0),
            ..FFTConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
