//! lockstep - procedural audiovisual intro engine
//!
//! Audio and graphics are both pure functions of one logical clock. Live
//! runs pace that clock by wall time; record runs step it frame by frame
//! and write every frame plus the raw audio track to disk.

pub mod app;
pub mod audio;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod error;
pub mod params;
pub mod rendering;
pub mod resolution;
pub mod timeline;
