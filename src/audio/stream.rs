//! Live audio output.
//!
//! A generation thread owns the ring buffer producer and renders blocks
//! ahead of playback; the cpal callback owns the consumer and only pops.
//! Shortfalls are filled with silence and counted as underruns, never
//! waited on.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};

use super::generator::AudioGenerator;
use crate::error::ResourceError;
use crate::params::audio_constants::{BLOCK_SIZE, RING_BUFFER_SAMPLES};
use crate::timeline::TimeIndex;

/// No pending seek
const NO_SEEK: u64 = u64::MAX;

/// How long the generation thread sleeps when the ring is full
const IDLE_PARK: Duration = Duration::from_millis(2);

/// State shared between the render thread, the generation thread and the
/// device callback. Atomics only.
#[derive(Debug)]
struct Shared {
    seek_frame: AtomicU64,
    underruns: AtomicU64,
    shutdown: AtomicBool,
}

/// Running output stream; dropping it stops playback and joins the
/// generation thread.
pub struct AudioStream {
    shared: Arc<Shared>,
    sample_rate: u32,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,

    feeder: Option<JoinHandle<()>>,
}

impl AudioStream {
    /// Open the default output device and start streaming from the top of
    /// the track.
    pub fn start(generator: AudioGenerator) -> Result<Self, ResourceError> {
        let sample_rate = generator.sample_rate();
        let channels = generator.channels();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(ResourceError::NoAudioDevice)?;

        let supported = device
            .supported_output_configs()?
            .find(|range| {
                range.channels() == channels
                    && range.sample_format() == cpal::SampleFormat::F32
                    && range.min_sample_rate().0 <= sample_rate
                    && range.max_sample_rate().0 >= sample_rate
            })
            .ok_or(ResourceError::UnsupportedAudioConfig {
                sample_rate,
                channels,
            })?;
        let config: cpal::StreamConfig = supported
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .into();

        log::info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        let shared = Arc::new(Shared {
            seek_frame: AtomicU64::new(NO_SEEK),
            underruns: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let ring = HeapRb::<f32>::new(RING_BUFFER_SAMPLES);
        let (mut producer, mut consumer) = ring.split();

        // Prefill so the first callbacks have data
        let mut generation = Feeder::new(generator, Arc::clone(&shared));
        generation.top_up(&mut producer);

        let feeder = thread::Builder::new()
            .name("audio-gen".to_string())
            .spawn(move || generation.run(producer))
            .map_err(ResourceError::Thread)?;
        let feeder_thread = feeder.thread().clone();

        let callback_shared = Arc::clone(&shared);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let popped = consumer.pop_slice(data);
                if popped < data.len() {
                    data[popped..].fill(0.0);
                    callback_shared.underruns.fetch_add(1, Ordering::Relaxed);
                }
                feeder_thread.unpark();
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self {
            shared,
            sample_rate,
            _stream: stream,
            feeder: Some(feeder),
        })
    }

    /// Restart generation at `time`. Already-queued samples still play out.
    pub fn seek(&self, time: TimeIndex) {
        self.shared
            .seek_frame
            .store(time.audio_frame(self.sample_rate), Ordering::Release);
        if let Some(feeder) = &self.feeder {
            feeder.thread().unpark();
        }
    }

    /// Callbacks that ran short since the last call
    pub fn take_underruns(&self) -> u64 {
        self.shared.underruns.swap(0, Ordering::Relaxed)
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(feeder) = self.feeder.take() {
            feeder.thread().unpark();
            if feeder.join().is_err() {
                log::error!("Audio generation thread panicked");
            }
        }
    }
}

/// Producer side: renders blocks into the ring while there is room.
struct Feeder {
    generator: AudioGenerator,
    shared: Arc<Shared>,
    cursor: u64,
    block: Vec<f32>,
}

impl Feeder {
    fn new(generator: AudioGenerator, shared: Arc<Shared>) -> Self {
        let block = vec![0.0; BLOCK_SIZE * generator.channels() as usize];
        Self {
            generator,
            shared,
            cursor: 0,
            block,
        }
    }

    fn run(mut self, mut producer: HeapProd<f32>) {
        while !self.shared.shutdown.load(Ordering::Acquire) {
            self.top_up(&mut producer);
            thread::park_timeout(IDLE_PARK);
        }
        log::debug!("Audio generation thread stopped at frame {}", self.cursor);
    }

    fn top_up(&mut self, producer: &mut HeapProd<f32>) {
        let seek = self.shared.seek_frame.swap(NO_SEEK, Ordering::AcqRel);
        if seek != NO_SEEK {
            self.cursor = seek;
        }

        while producer.vacant_len() >= self.block.len() {
            self.generator.fill(self.cursor, &mut self.block);
            producer.push_slice(&self.block);
            self.cursor += BLOCK_SIZE as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeder_fills_ring_with_track_audio() {
        let generator = AudioGenerator::default();
        let shared = Arc::new(Shared {
            seek_frame: AtomicU64::new(NO_SEEK),
            underruns: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        let (mut producer, mut consumer) = HeapRb::<f32>::new(4 * BLOCK_SIZE * 2).split();

        let mut feeder = Feeder::new(generator.clone(), shared);
        feeder.top_up(&mut producer);
        assert_eq!(producer.vacant_len(), 0);

        let mut out = vec![0.0; BLOCK_SIZE * 2];
        assert_eq!(consumer.pop_slice(&mut out), out.len());
        let mut expected = vec![0.0; BLOCK_SIZE * 2];
        generator.fill(0, &mut expected);
        assert_eq!(out, expected);
    }

    #[test]
    fn feeder_honours_seek_requests() {
        let generator = AudioGenerator::default();
        let shared = Arc::new(Shared {
            seek_frame: AtomicU64::new(NO_SEEK),
            underruns: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        let (mut producer, mut consumer) = HeapRb::<f32>::new(BLOCK_SIZE * 2).split();

        let mut feeder = Feeder::new(generator.clone(), Arc::clone(&shared));
        feeder.top_up(&mut producer);
        let mut out = vec![0.0; BLOCK_SIZE * 2];
        consumer.pop_slice(&mut out);

        let target = TimeIndex::from_secs_f64(10.0);
        shared
            .seek_frame
            .store(target.audio_frame(44_100), Ordering::Release);
        feeder.top_up(&mut producer);
        consumer.pop_slice(&mut out);

        let mut expected = vec![0.0; BLOCK_SIZE * 2];
        generator.fill(target.audio_frame(44_100), &mut expected);
        assert_eq!(out, expected);
    }
}
