//! Record mode: numbered PNG frames plus one raw PCM file.

use std::fs::{self, File};
use std::io::BufWriter;

use image::RgbImage;

use super::CaptureSink;
use crate::audio::AudioBuffer;
use crate::error::CaptureError;
use crate::params::RecordingConfig;

/// A frame whose pixels can be copied to the CPU.
pub trait ReadbackFrame {
    /// Frame dimensions (pixels)
    fn size(&self) -> (u32, u32);

    /// Tightly packed RGB8 rows, top row first
    fn read_rgb(&self) -> Result<Vec<u8>, String>;
}

/// CPU-resident RGB frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }
}

impl ReadbackFrame for RgbFrame {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_rgb(&self) -> Result<Vec<u8>, String> {
        Ok(self.pixels.clone())
    }
}

/// Writes `frames/frame_NNNNN.png` per tick and `audio.raw` once at the end.
///
/// Nothing is rolled back on failure: frames written before an error stay
/// on disk.
#[derive(Debug)]
pub struct RecordSink {
    config: RecordingConfig,
    frames_written: u64,
    audio_written: bool,
}

impl RecordSink {
    /// Create the output directories
    pub fn create(config: RecordingConfig) -> Result<Self, CaptureError> {
        let frames_dir = config.frames_dir();
        fs::create_dir_all(&frames_dir).map_err(|source| CaptureError::CreateDir {
            path: frames_dir.clone(),
            source,
        })?;
        log::info!("Recording to {}", config.output_dir().display());

        Ok(Self {
            config,
            frames_written: 0,
            audio_written: false,
        })
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn audio_written(&self) -> bool {
        self.audio_written
    }
}

impl<F: ReadbackFrame + ?Sized> CaptureSink<F> for RecordSink {
    fn accept(&mut self, frame: &F, index: u64) -> Result<(), CaptureError> {
        let (width, height) = frame.size();
        let pixels = frame
            .read_rgb()
            .map_err(|message| CaptureError::Readback { index, message })?;
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            CaptureError::Readback {
                index,
                message: format!("pixel data does not match {width}x{height}"),
            }
        })?;

        let path = self.config.frame_path(index);
        image
            .save(&path)
            .map_err(|source| CaptureError::WriteFrame { path, source })?;

        self.frames_written += 1;
        Ok(())
    }

    fn accept_audio(&mut self, audio: &AudioBuffer) -> Result<(), CaptureError> {
        let path = self.config.audio_path();
        if self.audio_written {
            return Err(CaptureError::AudioAlreadyWritten { path });
        }

        let written = File::create(&path).and_then(|file| audio.write_raw(BufWriter::new(file)));
        written.map_err(|source| CaptureError::WriteAudio { path, source })?;

        self.audio_written = true;
        log::info!(
            "Wrote {} samples ({} Hz, {} channels, f32le) to {}",
            audio.samples().len(),
            audio.sample_rate(),
            audio.channels(),
            self.config.audio_path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, shade: u8) -> RgbFrame {
        let mut frame = RgbFrame::new(width, height);
        for (i, px) in frame.pixels.chunks_exact_mut(3).enumerate() {
            px.copy_from_slice(&[(i % 256) as u8, shade, 255 - shade]);
        }
        frame
    }

    #[test]
    fn writes_numbered_png_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordSink::create(RecordingConfig::new(dir.path())).unwrap();

        sink.accept(&gradient(8, 4, 10), 0).unwrap();
        sink.accept(&gradient(8, 4, 20), 1).unwrap();
        assert_eq!(sink.frames_written(), 2);

        let first = dir.path().join("frames").join("frame_00000.png");
        let second = dir.path().join("frames").join("frame_00001.png");
        let decoded = image::open(&second).unwrap().to_rgb8();
        assert!(first.exists());
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.as_raw(), &gradient(8, 4, 20).pixels);
    }

    #[test]
    fn rejects_mismatched_pixel_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordSink::create(RecordingConfig::new(dir.path())).unwrap();

        let mut frame = RgbFrame::new(4, 4);
        frame.pixels.truncate(10);
        let err = sink.accept(&frame, 3).unwrap_err();
        assert!(matches!(err, CaptureError::Readback { index: 3, .. }));
    }

    #[test]
    fn writes_audio_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordSink::create(RecordingConfig::new(dir.path())).unwrap();
        let audio = AudioBuffer::from_samples(vec![0.25; 200], 44_100, 2);

        CaptureSink::<RgbFrame>::accept_audio(&mut sink, &audio).unwrap();
        let bytes = fs::read(dir.path().join("audio.raw")).unwrap();
        assert_eq!(bytes.len(), 200 * 4);
        assert_eq!(&bytes[..4], &0.25_f32.to_le_bytes());

        let err = CaptureSink::<RgbFrame>::accept_audio(&mut sink, &audio).unwrap_err();
        assert!(matches!(err, CaptureError::AudioAlreadyWritten { .. }));
    }

    #[test]
    fn write_failure_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordSink::create(RecordingConfig::new(dir.path())).unwrap();
        fs::remove_dir_all(dir.path().join("frames")).unwrap();

        let err = sink.accept(&gradient(2, 2, 0), 0).unwrap_err();
        match err {
            CaptureError::WriteFrame { path, .. } => {
                assert!(path.ends_with("frame_00000.png"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
