//! The tick loop that keeps audio and graphics in lockstep.

use std::time::Duration;

use super::clock::TimeSource;
use super::time::TimeIndex;
use crate::audio::{AudioBuffer, AudioGenerator, BandAnalyzer};
use crate::capture::CaptureSink;
use crate::error::Result;
use crate::params::{FFTConfig, RunConfig, TimelineParams};
use crate::rendering::{FrameInput, FrameRenderer};

/// How time advances, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Wall-clock paced; late ticks skip ahead instead of queueing
    Live,
    /// One fixed step per tick, every frame captured
    Record,
}

impl RunMode {
    pub fn of(config: &RunConfig) -> Self {
        if config.record() {
            Self::Record
        } else {
            Self::Live
        }
    }
}

/// Why a run ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UserStop,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Finished,
    Aborted(AbortReason),
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted(_))
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame for `time` went to the sink with sequence number `frame_index`
    Rendered { time: TimeIndex, frame_index: u64 },
    Finished,
    Stopped,
}

/// Where a tick's audio window comes from
enum AudioFeed {
    /// Not started yet
    Pending,
    /// Live: generate the window on demand
    Streaming { scratch: Vec<f32> },
    /// Record: slice the track synthesized at start, synthesizing windows
    /// that run past its end
    Bulk { track: AudioBuffer, scratch: Vec<f32> },
}

/// Timeline state machine: `Idle → Running → (Finished | Aborted)`.
///
/// Owns the current time and drives generator, analyzer, renderer and sink
/// in that order once per tick.
pub struct TimelineDriver<R, S, C> {
    mode: RunMode,
    developer: bool,
    params: TimelineParams,
    duration: Duration,
    frame_total: u64,

    generator: AudioGenerator,
    analyzer: BandAnalyzer,
    renderer: R,
    sink: S,
    clock: C,

    state: DriverState,
    feed: AudioFeed,
    current: TimeIndex,
    last_rendered: Option<TimeIndex>,
    frames_emitted: u64,

    /// Live mode: clock reading and timeline position the clock is measured from
    anchor_elapsed: Duration,
    anchor_time: TimeIndex,

    pending_scrub: Option<TimeIndex>,
    stop_requested: bool,
}

impl<R, S, C> TimelineDriver<R, S, C>
where
    R: FrameRenderer,
    S: CaptureSink<R::Frame>,
    C: TimeSource,
{
    pub fn new(
        config: &RunConfig,
        params: TimelineParams,
        generator: AudioGenerator,
        renderer: R,
        sink: S,
        clock: C,
    ) -> Result<Self> {
        params.validate()?;
        let analyzer = BandAnalyzer::new(FFTConfig::default())?;
        let duration = params.effective_duration(generator.duration());
        let frame_total = params.frame_count(duration);

        Ok(Self {
            mode: RunMode::of(config),
            developer: config.developer(),
            params,
            duration,
            frame_total,
            generator,
            analyzer,
            renderer,
            sink,
            clock,
            state: DriverState::Idle,
            feed: AudioFeed::Pending,
            current: TimeIndex::ZERO,
            last_rendered: None,
            frames_emitted: 0,
            anchor_elapsed: Duration::ZERO,
            anchor_time: TimeIndex::ZERO,
            pending_scrub: None,
            stop_requested: false,
        })
    }

    /// `Idle → Running`. Record mode synthesizes the whole track here.
    pub fn start(&mut self) {
        if self.state != DriverState::Idle {
            return;
        }

        self.current = TimeIndex::ZERO;
        self.anchor_elapsed = self.clock.elapsed();
        self.anchor_time = TimeIndex::ZERO;
        let scratch = vec![0.0; self.analyzer.window_frames() * self.generator.channels() as usize];
        self.feed = match self.mode {
            RunMode::Live => AudioFeed::Streaming { scratch },
            RunMode::Record => {
                log::info!("Synthesizing {:.1}s of audio", self.duration.as_secs_f32());
                AudioFeed::Bulk {
                    track: self.generator.bulk(self.duration),
                    scratch,
                }
            }
        };
        self.state = DriverState::Running;
        log::debug!(
            "Timeline running in {:?} mode, {} frames",
            self.mode,
            self.frame_total
        );
    }

    /// Advance by one tick.
    ///
    /// Starts an idle driver first. Terminal drivers render nothing and keep
    /// reporting how they ended. Any collaborator error aborts the run.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.state {
            DriverState::Idle => self.start(),
            DriverState::Running => {}
            DriverState::Finished => return Ok(TickOutcome::Finished),
            DriverState::Aborted(_) => return Ok(TickOutcome::Stopped),
        }

        if self.stop_requested {
            log::info!("Stopped at {}", self.current);
            self.state = DriverState::Aborted(AbortReason::UserStop);
            return Ok(TickOutcome::Stopped);
        }

        match self.advance() {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.state = DriverState::Aborted(AbortReason::Error);
                Err(err)
            }
        }
    }

    /// Tick until the run ends. Returns the terminal state.
    pub fn run_to_end(&mut self) -> Result<DriverState> {
        self.start();
        while !self.state.is_terminal() {
            if let TickOutcome::Rendered { frame_index, .. } = self.tick()? {
                let done = frame_index + 1;
                if self.mode == RunMode::Record && done % u64::from(self.params.frame_rate) == 0 {
                    log::info!("Recorded {}/{} frames", done, self.frame_total);
                }
            }
        }
        Ok(self.state)
    }

    fn advance(&mut self) -> Result<TickOutcome> {
        let Some(time) = self.next_time() else {
            return self.finish();
        };

        let bands = {
            let sample_rate = self.generator.sample_rate();
            let start = time.audio_frame(sample_rate);
            let window = self.analyzer.window_frames();
            let samples: &[f32] = match &mut self.feed {
                AudioFeed::Streaming { scratch } => {
                    self.generator.fill(start, scratch);
                    &scratch[..]
                }
                AudioFeed::Bulk { track, scratch } => {
                    let first = start as usize;
                    if first + window <= track.frames() {
                        track.frame_slice(first..first + window)
                    } else {
                        // Same samples live mode would analyze at this time
                        self.generator.fill(start, scratch);
                        &scratch[..]
                    }
                }
                AudioFeed::Pending => &[],
            };
            self.analyzer.analyze(samples, self.generator.channels())
        };

        let input = FrameInput {
            time,
            beat: self.generator.score().beat_at(time),
            envelope: self.generator.score().envelope_at(time),
            bands,
        };
        let frame = self.renderer.render(&input)?;

        let frame_index = self.frames_emitted;
        self.sink.accept(frame, frame_index)?;

        self.frames_emitted += 1;
        self.current = time;
        self.last_rendered = Some(time);
        Ok(TickOutcome::Rendered { time, frame_index })
    }

    /// Time to render this tick, or `None` once the end is reached
    fn next_time(&mut self) -> Option<TimeIndex> {
        let end = TimeIndex::from_duration(self.duration);

        match self.mode {
            RunMode::Record => {
                if self.frames_emitted >= self.frame_total {
                    return None;
                }
                Some(TimeIndex::from_frame(self.frames_emitted, self.params.frame_rate))
            }
            RunMode::Live => {
                let elapsed = self.clock.elapsed();

                if let Some(target) = self.pending_scrub.take() {
                    self.anchor_elapsed = elapsed;
                    self.anchor_time = target;
                    return (target < end).then_some(target);
                }

                let wall = self
                    .anchor_time
                    .saturating_add(elapsed.saturating_sub(self.anchor_elapsed));
                let time = match self.last_rendered {
                    Some(last) => wall.max(last),
                    None => wall,
                };
                (time < end).then_some(time)
            }
        }
    }

    fn finish(&mut self) -> Result<TickOutcome> {
        if let AudioFeed::Bulk { track, .. } = std::mem::replace(&mut self.feed, AudioFeed::Pending) {
            log::info!("Writing {} audio frames", track.frames());
            self.sink.accept_audio(&track)?;
        }
        log::info!("Finished after {} frames", self.frames_emitted);
        self.state = DriverState::Finished;
        Ok(TickOutcome::Finished)
    }

    /// Developer mode: jump to `target` on the next tick.
    ///
    /// The target is clamped to the run's duration and returned so the
    /// caller can reposition audio playback to match. Returns `None` (and
    /// changes nothing) outside developer live runs.
    pub fn scrub(&mut self, target: TimeIndex) -> Option<TimeIndex> {
        if !self.developer || self.mode != RunMode::Live {
            log::warn!("Ignoring timeline scrub outside developer live mode");
            return None;
        }
        if self.state.is_terminal() {
            return None;
        }
        let target = target.min(TimeIndex::from_duration(self.duration));
        log::debug!("Scrub to {}", target);
        self.pending_scrub = Some(target);
        Some(target)
    }

    /// Scrub relative to the last rendered time
    pub fn scrub_by(&mut self, delta: Duration, forward: bool) -> Option<TimeIndex> {
        let base = self.current;
        let target = if forward {
            base.saturating_add(delta)
        } else {
            base.saturating_sub(delta)
        };
        self.scrub(target)
    }

    /// Ask the driver to stop; observed at the next tick boundary.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Last rendered time
    pub fn current_time(&self) -> TimeIndex {
        self.current
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Frames a complete record run produces
    pub fn frame_total(&self) -> u64 {
        self.frame_total
    }

    /// Effective run length after clamping
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use clap::Parser;

    use super::*;
    use crate::audio::AudioBands;
    use crate::capture::{RecordSink, RgbFrame};
    use crate::cli::Args;
    use crate::error::{CaptureError, IntroError, RenderError};
    use crate::params::RecordingConfig;
    use crate::timeline::ManualClock;

    /// CPU stand-in for the GPU renderer; the image depends only on the input
    struct GradientRenderer {
        frame: RgbFrame,
        times: Vec<TimeIndex>,
        bands: Vec<AudioBands>,
        fail_on: Option<usize>,
    }

    impl GradientRenderer {
        fn new() -> Self {
            Self {
                frame: RgbFrame::new(16, 8),
                times: Vec::new(),
                bands: Vec::new(),
                fail_on: None,
            }
        }
    }

    impl FrameRenderer for GradientRenderer {
        type Frame = RgbFrame;

        fn render(&mut self, input: &FrameInput) -> std::result::Result<&RgbFrame, RenderError> {
            if self.fail_on == Some(self.times.len()) {
                return Err(RenderError::Gpu {
                    time: input.time,
                    message: "device lost".to_string(),
                });
            }
            self.times.push(input.time);
            self.bands.push(input.bands);

            let shade = (input.time.as_secs_f32() * 200.0) as u8;
            let level = (input.bands.low * 255.0).min(255.0) as u8;
            for (i, px) in self.frame.pixels.chunks_exact_mut(3).enumerate() {
                px.copy_from_slice(&[shade, level, i as u8]);
            }
            Ok(&self.frame)
        }
    }

    /// Remembers what it was handed
    #[derive(Default)]
    struct LogSink {
        frames: Vec<u64>,
        audio_frames: Option<usize>,
    }

    impl CaptureSink<RgbFrame> for LogSink {
        fn accept(&mut self, _frame: &RgbFrame, index: u64) -> std::result::Result<(), CaptureError> {
            self.frames.push(index);
            Ok(())
        }

        fn accept_audio(&mut self, audio: &AudioBuffer) -> std::result::Result<(), CaptureError> {
            self.audio_frames = Some(audio.frames());
            Ok(())
        }
    }

    fn short_params() -> TimelineParams {
        TimelineParams {
            frame_rate: 10,
            requested_duration: Some(Duration::from_millis(500)),
        }
    }

    fn driver<S: CaptureSink<RgbFrame>>(
        developer: bool,
        record: bool,
        params: TimelineParams,
        sink: S,
        clock: ManualClock,
    ) -> TimelineDriver<GradientRenderer, S, ManualClock> {
        let config = RunConfig::new(16, 8, developer, false, record).unwrap();
        TimelineDriver::new(
            &config,
            params,
            AudioGenerator::default(),
            GradientRenderer::new(),
            sink,
            clock,
        )
        .unwrap()
    }

    fn secs(seconds: f64) -> TimeIndex {
        TimeIndex::from_secs_f64(seconds)
    }

    #[test]
    fn record_mode_emits_every_frame_once_in_order() {
        let mut driver = driver(false, true, short_params(), LogSink::default(), ManualClock::new());
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(driver.frame_total(), 5);

        assert_eq!(driver.run_to_end().unwrap(), DriverState::Finished);

        assert_eq!(driver.sink().frames, vec![0, 1, 2, 3, 4]);
        let expected: Vec<_> = (0..5).map(|n| TimeIndex::from_frame(n, 10)).collect();
        assert_eq!(driver.renderer().times, expected);
        assert_eq!(driver.sink().audio_frames, Some(22_050));
    }

    #[test]
    fn record_mode_ignores_the_wall_clock() {
        let clock = ManualClock::new();
        let mut driver = driver(false, true, short_params(), LogSink::default(), clock.clone());

        driver.tick().unwrap();
        clock.advance(Duration::from_secs(30));
        let outcome = driver.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Rendered {
                time: TimeIndex::from_frame(1, 10),
                frame_index: 1
            }
        );
    }

    #[test]
    fn record_run_writes_frames_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::create(RecordingConfig::new(dir.path())).unwrap();
        let mut driver = driver(false, true, short_params(), sink, ManualClock::new());

        assert_eq!(driver.run_to_end().unwrap(), DriverState::Finished);

        let frames = dir.path().join("frames");
        for n in 0..5 {
            assert!(frames.join(format!("frame_{n:05}.png")).exists());
        }
        assert!(!frames.join("frame_00005.png").exists());
        assert_eq!(fs::read_dir(&frames).unwrap().count(), 5);

        let audio = fs::metadata(dir.path().join("audio.raw")).unwrap();
        assert_eq!(audio.len(), 22_050 * 2 * 4);
    }

    #[test]
    fn record_runs_are_reproducible() {
        let record = |dir: &Path| {
            let sink = RecordSink::create(RecordingConfig::new(dir)).unwrap();
            let mut driver = driver(false, true, short_params(), sink, ManualClock::new());
            driver.run_to_end().unwrap();
        };

        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        record(a.path());
        record(b.path());

        for n in 0..5 {
            let name = format!("frames/frame_{n:05}.png");
            assert_eq!(
                fs::read(a.path().join(&name)).unwrap(),
                fs::read(b.path().join(&name)).unwrap()
            );
        }
        assert_eq!(
            fs::read(a.path().join("audio.raw")).unwrap(),
            fs::read(b.path().join("audio.raw")).unwrap()
        );
    }

    #[test]
    fn live_time_follows_clock_and_skips_when_late() {
        let clock = ManualClock::new();
        let mut driver = driver(
            false,
            false,
            TimelineParams::default(),
            LogSink::default(),
            clock.clone(),
        );

        assert_eq!(
            driver.tick().unwrap(),
            TickOutcome::Rendered {
                time: TimeIndex::ZERO,
                frame_index: 0
            }
        );

        clock.advance(Duration::from_millis(100));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), secs(0.1));

        // A slow tick does not queue the missed frames
        clock.advance(Duration::from_secs(1));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), secs(1.1));
        assert_eq!(driver.frames_emitted(), 3);
        assert_eq!(driver.sink().frames, vec![0, 1, 2]);
    }

    #[test]
    fn live_time_never_goes_backwards() {
        let clock = ManualClock::new();
        let mut driver = driver(
            false,
            false,
            TimelineParams::default(),
            LogSink::default(),
            clock.clone(),
        );

        driver.tick().unwrap();
        clock.set(Duration::from_secs(2));
        driver.tick().unwrap();
        let first = driver.current_time();
        assert_eq!(first, secs(2.0));

        clock.set(Duration::from_secs(1));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), first);
    }

    #[test]
    fn live_run_finishes_at_duration_without_audio_file() {
        let clock = ManualClock::new();
        let mut driver = driver(false, false, short_params(), LogSink::default(), clock.clone());

        driver.tick().unwrap();
        clock.set(Duration::from_millis(600));
        assert_eq!(driver.tick().unwrap(), TickOutcome::Finished);
        assert_eq!(driver.state(), DriverState::Finished);
        assert_eq!(driver.sink().audio_frames, None);

        // Terminal drivers render nothing
        assert_eq!(driver.tick().unwrap(), TickOutcome::Finished);
        assert_eq!(driver.frames_emitted(), 1);
    }

    #[test]
    fn duration_is_clamped_to_track() {
        let params = TimelineParams {
            frame_rate: 60,
            requested_duration: Some(Duration::from_secs(600)),
        };
        let driver = driver(false, true, params, LogSink::default(), ManualClock::new());
        assert_eq!(driver.duration(), Duration::from_secs(64));
        assert_eq!(driver.frame_total(), 64 * 60);
    }

    fn record_args(duration: &str) -> TimelineParams {
        Args::try_parse_from(["lockstep", "-R", "--duration", duration])
            .unwrap()
            .timeline_params()
            .unwrap()
    }

    #[test]
    fn decimal_cli_duration_records_exact_frame_count() {
        let mut driver = driver(false, true, record_args("0.1"), LogSink::default(), ManualClock::new());
        assert_eq!(driver.duration(), Duration::from_millis(100));
        assert_eq!(driver.frame_total(), 6);

        assert_eq!(driver.run_to_end().unwrap(), DriverState::Finished);
        assert_eq!(driver.sink().frames, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(driver.sink().audio_frames, Some(4_410));
    }

    #[test]
    fn oversized_cli_durations_clamp_to_track() {
        for value in ["1e30", "64.5"] {
            let driver = driver(false, true, record_args(value), LogSink::default(), ManualClock::new());
            assert_eq!(driver.duration(), Duration::from_secs(64), "{value}");
            assert_eq!(driver.frame_total(), 64 * 60, "{value}");
        }
    }

    #[test]
    fn record_bands_near_a_shortened_end_match_live() {
        // Last frame's analysis window runs past the 510 ms record track
        let params = TimelineParams {
            frame_rate: 10,
            requested_duration: Some(Duration::from_millis(510)),
        };

        let mut record = driver(false, true, params.clone(), LogSink::default(), ManualClock::new());
        record.run_to_end().unwrap();
        assert_eq!(record.renderer().times.last(), Some(&secs(0.5)));

        let clock = ManualClock::new();
        let mut live = driver(false, false, params, LogSink::default(), clock.clone());
        live.tick().unwrap();
        clock.set(Duration::from_millis(500));
        live.tick().unwrap();
        assert_eq!(live.current_time(), secs(0.5));

        assert_eq!(record.renderer().bands.last(), live.renderer().bands.last());
    }

    #[test]
    fn stop_request_ends_run_at_tick_boundary() {
        let mut driver = driver(false, true, short_params(), LogSink::default(), ManualClock::new());

        driver.tick().unwrap();
        driver.request_stop();
        assert_eq!(driver.tick().unwrap(), TickOutcome::Stopped);
        assert_eq!(driver.state(), DriverState::Aborted(AbortReason::UserStop));
        assert_eq!(driver.tick().unwrap(), TickOutcome::Stopped);

        // Partial record runs do not write the audio track
        assert_eq!(driver.sink().frames, vec![0]);
        assert_eq!(driver.sink().audio_frames, None);
    }

    #[test]
    fn render_failure_aborts_the_run() {
        let mut driver = driver(false, true, short_params(), LogSink::default(), ManualClock::new());
        driver.renderer.fail_on = Some(2);

        let err = driver.run_to_end().unwrap_err();
        assert!(matches!(err, IntroError::Render(RenderError::Gpu { .. })));
        assert_eq!(driver.state(), DriverState::Aborted(AbortReason::Error));
        assert_eq!(driver.sink().frames, vec![0, 1]);
        assert_eq!(driver.sink().audio_frames, None);
    }

    #[test]
    fn scrub_requires_developer_live_mode() {
        let mut live = driver(false, false, short_params(), LogSink::default(), ManualClock::new());
        assert_eq!(live.scrub(secs(0.2)), None);

        let mut record = driver(true, true, short_params(), LogSink::default(), ManualClock::new());
        assert_eq!(record.scrub(secs(0.2)), None);
    }

    #[test]
    fn scrub_jumps_backwards_and_reanchors_the_clock() {
        let clock = ManualClock::new();
        let mut driver = driver(
            true,
            false,
            TimelineParams::default(),
            LogSink::default(),
            clock.clone(),
        );

        driver.tick().unwrap();
        clock.set(Duration::from_secs(5));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), secs(5.0));

        assert_eq!(driver.scrub(secs(2.0)), Some(secs(2.0)));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), secs(2.0));

        clock.advance(Duration::from_millis(250));
        driver.tick().unwrap();
        assert_eq!(driver.current_time(), secs(2.25));
    }

    #[test]
    fn scrub_is_clamped_to_duration() {
        let clock = ManualClock::new();
        let mut driver = driver(true, false, short_params(), LogSink::default(), clock);
        driver.tick().unwrap();

        assert_eq!(driver.scrub(secs(90.0)), Some(secs(0.5)));
        assert_eq!(driver.tick().unwrap(), TickOutcome::Finished);
    }

    #[test]
    fn scrub_by_moves_relative_to_current_time() {
        let clock = ManualClock::new();
        let mut driver = driver(
            true,
            false,
            TimelineParams::default(),
            LogSink::default(),
            clock.clone(),
        );

        driver.tick().unwrap();
        clock.set(Duration::from_secs(3));
        driver.tick().unwrap();
        assert_eq!(
            driver.scrub_by(Duration::from_secs(10), false),
            Some(TimeIndex::ZERO)
        );
        assert_eq!(
            driver.scrub_by(Duration::from_secs(1), true),
            Some(secs(4.0))
        );
    }
}
