//! Procedural audio: synthesis, bulk and streaming generation, live output
//! and band analysis.

mod buffer;
mod fft;
mod generator;
mod stream;
mod synthesis;

// Re-export public types
pub use buffer::AudioBuffer;
pub use fft::{hann_window, AudioBands, BandAnalyzer};
pub use generator::AudioGenerator;
pub use stream::AudioStream;
pub use synthesis::Score;
