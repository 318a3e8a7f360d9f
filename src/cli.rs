//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::params::{RecordingConfig, RunConfig, TimelineParams};
use crate::resolution::parse_resolution;

/// Resolution used when none is given
const DEFAULT_RESOLUTION: (u32, u32) = (1280, 720);

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "lockstep")]
#[command(about = "Procedural audiovisual intro, played live or recorded frame by frame", long_about = None)]
pub struct Args {
    /// Developer mode: timeline scrubbing and frame timing logs
    #[arg(short = 'd', long)]
    pub developer: bool,

    /// Record frames and audio to disk instead of playing live
    #[arg(short = 'R', long)]
    pub record: bool,

    /// Output resolution: WIDTHxHEIGHT, 720p or 1080p
    #[arg(short = 'r', long, value_name = "RES")]
    pub resolution: Option<String>,

    /// Run in a window instead of fullscreen
    #[arg(short = 'w', long)]
    pub window: bool,

    /// Stop after this many seconds (clamped to the track length)
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Record mode output directory
    #[arg(short = 'o', long, value_name = "DIR", default_value = "recording")]
    pub output: PathBuf,
}

impl Args {
    /// Resolve flags and resolution into the run configuration
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let (width, height) = match &self.resolution {
            Some(resolution) => parse_resolution(resolution)?,
            None => DEFAULT_RESOLUTION,
        };
        RunConfig::new(width, height, self.developer, !self.window, self.record)
    }

    pub fn timeline_params(&self) -> Result<TimelineParams, ConfigError> {
        match self.duration {
            Some(seconds) => TimelineParams::with_duration_secs(seconds),
            None => Ok(TimelineParams::default()),
        }
    }

    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig::new(&self.output)
    }
}
