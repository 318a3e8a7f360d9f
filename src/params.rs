//! Parameter definitions with units and documented semantics.
//!
//! Fixed constants (sample format, tempo, frame rate) live here alongside
//! the parameter structs built from the command line.

pub mod audio;
pub mod render;
pub mod timeline;

// Re-export all types
pub use audio::{audio_constants, FFTConfig};
pub use render::{CameraPath, RecordingConfig, RunConfig};
pub use timeline::{TimelineParams, FRAME_RATE, TRACK_DURATION};
