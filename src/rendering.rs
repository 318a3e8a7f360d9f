//! Frame rendering.
//!
//! The driver hands the renderer a [`FrameInput`] per tick; the renderer
//! draws into its own offscreen target and lends it back to the caller. The
//! image depends on the input and nothing else.

mod framebuffer;
mod gpu;
mod noise_texture;
mod renderer;

pub use framebuffer::{FrameBuffer, FRAME_FORMAT};
pub use gpu::GpuContext;
pub use noise_texture::NoiseTexture;
pub use renderer::{IntroRenderer, Uniforms};

use crate::audio::AudioBands;
use crate::error::RenderError;
use crate::timeline::TimeIndex;

/// Everything the image for one tick may depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub time: TimeIndex,

    /// Beat position since the top of the track (fractional)
    pub beat: f32,

    /// Master fade level, 0..1
    pub envelope: f32,

    pub bands: AudioBands,
}

/// Produces the image for a time index.
pub trait FrameRenderer {
    type Frame: ?Sized;

    fn render(&mut self, input: &FrameInput) -> Result<&Self::Frame, RenderError>;
}
