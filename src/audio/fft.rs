//! FFT band analysis of a tick's audio window.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::ConfigError;
use crate::params::FFTConfig;

/// Audio frequency band energies fed to the renderer
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioBands {
    pub low: f32,  // Bass (20-200 Hz)
    pub mid: f32,  // Mids (200-1000 Hz)
    pub high: f32, // Highs (1000-8000 Hz)
}

/// Synchronous band analyzer.
///
/// Runs on the render thread against the same samples the listener hears at
/// that time index, so the result is reproducible in record mode.
pub struct BandAnalyzer {
    config: FFTConfig,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
}

impl BandAnalyzer {
    pub fn new(config: FFTConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();

        Ok(Self {
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            window,
            fft,
            config,
        })
    }

    /// Number of frames the analyzer looks at per call
    pub fn window_frames(&self) -> usize {
        self.config.fft_size
    }

    /// Analyze interleaved samples; channels are averaged to mono and short
    /// input is zero-padded.
    pub fn analyze(&mut self, interleaved: &[f32], channels: u16) -> AudioBands {
        let channels = channels.max(1) as usize;

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let frame = interleaved.get(i * channels..(i + 1) * channels);
            let mono = frame.map_or(0.0, |f| f.iter().sum::<f32>() / channels as f32);
            *slot = Complex::new(mono * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        // Scale so a full-scale sine lands near 1.0 in its bin
        let scale = 4.0 / self.config.fft_size as f32;
        let band = |bins: std::ops::Range<usize>, buffer: &[Complex<f32>]| {
            let len = bins.len().max(1) as f32;
            buffer[bins].iter().map(|c| c.norm()).sum::<f32>() / len * scale
        };

        AudioBands {
            low: band(self.config.bass_bins(), &self.buffer),
            mid: band(self.config.mid_bins(), &self.buffer),
            high: band(self.config.high_bins(), &self.buffer),
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
