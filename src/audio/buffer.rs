//! Interleaved sample storage.

use std::io::{self, Write};
use std::ops::Range;

use crate::params::audio_constants::{CHANNELS, SAMPLE_RATE};

/// Interleaved `f32` sample frames at a fixed rate and channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Silent buffer of `frames` frames in the engine's fixed format
    pub fn silent(frames: usize) -> Self {
        Self {
            samples: vec![0.0; frames * CHANNELS as usize],
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
        }
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(channels > 0 && samples.len() % channels as usize == 0);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (one sample per channel each)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Samples for a frame range, clamped to the end of the buffer
    pub fn frame_slice(&self, frames: Range<usize>) -> &[f32] {
        let channels = self.channels as usize;
        let end = frames.end.min(self.frames());
        let start = frames.start.min(end);
        &self.samples[start * channels..end * channels]
    }

    /// Write the samples as headerless little-endian `f32` PCM
    pub fn write_raw<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for sample in &self.samples {
            writer.write_all(&sample.to_le_bytes())?;
        }
        writer.flush()
    }
}
