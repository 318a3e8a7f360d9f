//! Error taxonomy.
//!
//! Every fatal failure ends up in [`IntroError`] and terminates the process
//! with a diagnostic. Audio underruns are not errors; see
//! [`crate::audio::AudioStream::take_underruns`].

use std::io;
use std::path::PathBuf;

use crate::timeline::TimeIndex;

/// Result alias used across the crate.
pub type Result<T, E = IntroError> = std::result::Result<T, E>;

/// Bad startup configuration. Reported before the engine starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid resolution string '{0}'")]
    Unparseable(String),

    #[error("invalid width x height in resolution string '{0}'")]
    InvalidDimensions(String),

    #[error("invalid progressive mode identifier in resolution string '{0}'")]
    UnsupportedProgressive(String),

    #[error("resolution must be positive, got {width}x{height}")]
    NonPositive { width: u32, height: u32 },

    #[error("invalid duration {0}, expected a positive number of seconds")]
    InvalidDuration(f64),

    #[error("invalid frame rate {0}")]
    InvalidFrameRate(u32),

    #[error("invalid analysis configuration: {0}")]
    Analysis(String),
}

/// GPU, window or audio device setup failure.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create presentation surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("presentation surface is not supported by the GPU adapter")]
    SurfaceUnsupported,

    #[error("failed to build GPU pipeline: {0}")]
    Pipeline(String),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop failure: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("no audio output device available")]
    NoAudioDevice,

    #[error("failed to query audio output configurations: {0}")]
    AudioConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("audio device does not support {channels} channel f32 output at {sample_rate} Hz")]
    UnsupportedAudioConfig { sample_rate: u32, channels: u16 },

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn audio generation thread: {0}")]
    Thread(#[source] io::Error),
}

/// Failure while drawing a tick's frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("GPU error while rendering {time}: {message}")]
    Gpu { time: TimeIndex, message: String },
}

/// Failure while persisting or presenting a finished frame or the audio track.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read back frame {index}: {message}")]
    Readback { index: u64, message: String },

    #[error("failed to write frame {}: {source}", path.display())]
    WriteFrame {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write audio {}: {source}", path.display())]
    WriteAudio {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("audio track was already written to {}", path.display())]
    AudioAlreadyWritten { path: PathBuf },

    #[error("failed to present frame {index}: {source}")]
    Present {
        index: u64,
        #[source]
        source: wgpu::SurfaceError,
    },
}

/// Top-level error returned by the engine.
#[derive(Debug, thiserror::Error)]
pub enum IntroError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_name_the_input() {
        let err = ConfigError::UnsupportedProgressive("480p".to_string());
        assert_eq!(
            err.to_string(),
            "invalid progressive mode identifier in resolution string '480p'"
        );
    }

    #[test]
    fn intro_error_is_transparent() {
        let err: IntroError = ConfigError::Unparseable("abc".to_string()).into();
        assert_eq!(err.to_string(), "invalid resolution string 'abc'");
    }
}
