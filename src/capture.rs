//! Where finished frames and the audio track go.
//!
//! [`RecordSink`] persists frames and audio to disk; [`LiveSink`] presents
//! frames to the window. The driver is generic over [`CaptureSink`], so the
//! mode decision is made once, when the sink is built.

mod live;
mod record;

pub use live::LiveSink;
pub use record::{ReadbackFrame, RecordSink, RgbFrame};

use crate::audio::AudioBuffer;
use crate::error::CaptureError;

/// Receiver for a run's output.
pub trait CaptureSink<F: ?Sized> {
    /// Take the frame rendered this tick; `index` is its sequence number
    fn accept(&mut self, frame: &F, index: u64) -> Result<(), CaptureError>;

    /// Take the complete audio track at the end of a record run
    fn accept_audio(&mut self, audio: &AudioBuffer) -> Result<(), CaptureError>;
}
