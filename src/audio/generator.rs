//! Bulk and streaming access to the synthesized track.

use std::sync::Arc;
use std::time::Duration;

use super::buffer::AudioBuffer;
use super::synthesis::Score;
use crate::timeline::TimeIndex;

/// Cheap, cloneable handle over the read-only [`Score`].
///
/// Clones can be moved to the audio thread; the score holds no mutable
/// state, so concurrent rendering from several threads is fine.
#[derive(Debug, Clone)]
pub struct AudioGenerator {
    score: Arc<Score>,
}

impl Default for AudioGenerator {
    fn default() -> Self {
        Self::new(Score::new())
    }
}

impl AudioGenerator {
    pub fn new(score: Score) -> Self {
        Self {
            score: Arc::new(score),
        }
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn sample_rate(&self) -> u32 {
        self.score.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.score.channels()
    }

    /// Authored length of the track
    pub fn duration(&self) -> Duration {
        self.score.duration()
    }

    /// Synthesize `duration` of audio from the start of the track in one go.
    ///
    /// `duration` is clamped to the authored length.
    pub fn bulk(&self, duration: Duration) -> AudioBuffer {
        let duration = duration.min(self.duration());
        let frames = TimeIndex::from_duration(duration).audio_frame(self.sample_rate()) as usize;
        let mut buffer = AudioBuffer::silent(frames);
        self.score.render(0, buffer.samples_mut());
        buffer
    }

    /// Fill `out` with interleaved frames starting at frame `start`.
    ///
    /// Frames past the authored end are silence.
    pub fn fill(&self, start: u64, out: &mut [f32]) {
        self.score.render(start, out);
    }

    /// Allocate and fill a chunk of `frames` frames starting at `time`
    pub fn chunk(&self, time: TimeIndex, frames: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::silent(frames);
        self.fill(time.audio_frame(self.sample_rate()), buffer.samples_mut());
        buffer
    }
}
