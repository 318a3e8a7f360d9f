//! Run, rendering and recording configuration.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Validated startup configuration, immutable once built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    width: u32,
    height: u32,
    developer: bool,
    fullscreen: bool,
    record: bool,
}

impl RunConfig {
    /// Build a configuration; fails unless both dimensions are positive
    pub fn new(
        width: u32,
        height: u32,
        developer: bool,
        fullscreen: bool,
        record: bool,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::NonPositive { width, height });
        }
        Ok(Self {
            width,
            height,
            developer,
            fullscreen,
            record,
        })
    }

    /// Output width (pixels)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output height (pixels)
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn developer(&self) -> bool {
        self.developer
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn record(&self) -> bool {
        self.record
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            developer: false,
            fullscreen: true,
            record: false,
        }
    }
}

/// Camera flight through the tube.
///
/// The shader evaluates the same centerline, so the camera stays inside the
/// tube as long as sway amplitudes stay below the tube radius.
#[derive(Debug, Clone)]
pub struct CameraPath {
    /// Forward movement speed (units per second)
    pub forward_speed: f32,

    /// Centerline X sway amplitude (units)
    pub sway_x_amplitude: f32,

    /// Centerline X sway spatial frequency (radians per unit of depth)
    pub sway_x_frequency: f32,

    /// Centerline Y sway amplitude (units)
    pub sway_y_amplitude: f32,

    /// Centerline Y sway spatial frequency (radians per unit of depth)
    pub sway_y_frequency: f32,

    /// How far ahead along the centerline the camera looks (units)
    pub look_ahead: f32,

    /// Tube radius (units)
    pub tube_radius: f32,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,
}

impl Default for CameraPath {
    fn default() -> Self {
        Self {
            forward_speed: 4.0,
            sway_x_amplitude: 1.6,
            sway_x_frequency: 0.11,
            sway_y_amplitude: 1.1,
            sway_y_frequency: 0.07,
            look_ahead: 3.0,
            tube_radius: 2.4,
            fov_degrees: 75.0,
        }
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Output directory for frames and audio
    pub output_dir: PathBuf,
}

impl RecordingConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    /// Path of frame `index`, zero-padded to five digits
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.frames_dir().join(format!("frame_{index:05}.png"))
    }

    /// Raw PCM audio file path
    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join("audio.raw")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self::new("recording")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_rejects_zero_dimensions() {
        assert!(RunConfig::new(0, 720, false, true, false).is_err());
        assert!(RunConfig::new(1280, 0, false, true, false).is_err());

        let config = RunConfig::new(1920, 1080, true, false, true).unwrap();
        assert_eq!((config.width(), config.height()), (1920, 1080));
        assert!(config.developer());
        assert!(!config.fullscreen());
        assert!(config.record());
    }

    #[test]
    fn frame_paths_are_zero_padded() {
        let config = RecordingConfig::new("out");
        assert_eq!(
            config.frame_path(7),
            Path::new("out").join("frames").join("frame_00007.png")
        );
        assert_eq!(config.audio_path(), Path::new("out").join("audio.raw"));
    }

    #[test]
    fn camera_sway_stays_inside_tube() {
        let path = CameraPath::default();
        let sway = (path.sway_x_amplitude.powi(2) + path.sway_y_amplitude.powi(2)).sqrt();
        assert!(sway < path.tube_radius);
    }
}
