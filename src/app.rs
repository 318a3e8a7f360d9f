//! Run entry points: headless recording and the windowed live session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::audio::{AudioGenerator, AudioStream};
use crate::capture::{LiveSink, RecordSink};
use crate::error::{IntroError, ResourceError, Result};
use crate::params::{CameraPath, RecordingConfig, RunConfig, TimelineParams};
use crate::rendering::{GpuContext, IntroRenderer};
use crate::timeline::{DriverState, TickOutcome, TimeIndex, TimelineDriver, WallClock};

/// Render every frame offscreen and write it, with the audio track, to disk.
pub fn run_record(
    config: &RunConfig,
    params: TimelineParams,
    recording: RecordingConfig,
) -> Result<DriverState> {
    let gpu = GpuContext::headless()?;
    let renderer = IntroRenderer::new(&gpu, config, CameraPath::default())?;
    let sink = RecordSink::create(recording)?;

    let mut driver = TimelineDriver::new(
        config,
        params,
        AudioGenerator::default(),
        renderer,
        sink,
        WallClock::new(),
    )?;
    log::info!(
        "Recording {} frames at {}x{}",
        driver.frame_total(),
        config.width(),
        config.height()
    );

    let started = Instant::now();
    let state = driver.run_to_end()?;
    log::info!(
        "Recorded {} frames in {:.1}s",
        driver.frames_emitted(),
        started.elapsed().as_secs_f32()
    );
    Ok(state)
}

/// Open the window and audio device and play until the end, Escape or close.
pub fn run_live(config: RunConfig, params: TimelineParams) -> Result<DriverState> {
    let event_loop = EventLoop::new().map_err(ResourceError::from)?;
    let mut app = LiveApp::new(config, params);
    event_loop.run_app(&mut app).map_err(ResourceError::from)?;
    app.finish()
}

type LiveDriver = TimelineDriver<IntroRenderer, LiveSink, WallClock>;

/// Everything that lives as long as the window
struct LiveSession {
    window: Arc<Window>,
    driver: LiveDriver,

    /// Audio output stream (kept alive)
    audio: AudioStream,

    last_tick: Instant,
}

/// Main application state
struct LiveApp {
    config: RunConfig,
    params: TimelineParams,
    session: Option<LiveSession>,
    error: Option<IntroError>,
}

impl LiveApp {
    fn new(config: RunConfig, params: TimelineParams) -> Self {
        Self {
            config,
            params,
            session: None,
            error: None,
        }
    }

    fn open(&self, event_loop: &ActiveEventLoop) -> Result<LiveSession> {
        let mut attributes = Window::default_attributes()
            .with_title("lockstep")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width(),
                self.config.height(),
            ));
        if self.config.fullscreen() {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(ResourceError::from)?,
        );
        if self.config.fullscreen() {
            window.set_cursor_visible(false);
        }

        let (gpu, surface) = GpuContext::for_window(Arc::clone(&window))?;
        let renderer = IntroRenderer::new(&gpu, &self.config, CameraPath::default())?;
        let sink = LiveSink::new(
            &gpu,
            Arc::clone(&window),
            surface,
            self.config.aspect_ratio(),
        );

        let generator = AudioGenerator::default();
        let mut driver = TimelineDriver::new(
            &self.config,
            self.params.clone(),
            generator.clone(),
            renderer,
            sink,
            WallClock::new(),
        )?;

        // Audio and clock start together
        let audio = AudioStream::start(generator)?;
        driver.start();

        log::info!("Playing; press ESC to quit");
        if self.config.developer() {
            log::info!("Developer keys: Left/Right 1s, PageUp/PageDown 10s, Home restart");
        }

        Ok(LiveSession {
            window,
            driver,
            audio,
            last_tick: Instant::now(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: IntroError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.driver.tick() {
            Ok(TickOutcome::Rendered { time, frame_index }) => {
                let underruns = session.audio.take_underruns();
                if underruns > 0 {
                    log::warn!("Audio underrun ({} callbacks) at {}", underruns, time);
                }
                if self.config.developer() {
                    let now = Instant::now();
                    log::debug!(
                        "Frame {} at {} took {:.2}ms",
                        frame_index,
                        time,
                        (now - session.last_tick).as_secs_f64() * 1000.0
                    );
                    session.last_tick = now;
                }
            }
            Ok(TickOutcome::Finished | TickOutcome::Stopped) => event_loop.exit(),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn seek(&mut self, seek: Seek) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let target = match seek {
            Seek::By { delta, forward } => session.driver.scrub_by(delta, forward),
            Seek::To(time) => session.driver.scrub(time),
        };
        if let Some(time) = target {
            session.audio.seek(time);
        }
    }

    fn request_stop(&mut self) {
        if let Some(session) = &mut self.session {
            session.driver.request_stop();
            session.window.request_redraw();
        }
    }

    /// Terminal state of the run, or the error that ended it
    fn finish(self) -> Result<DriverState> {
        if let Some(session) = &self.session {
            let dropped = session.driver.sink().dropped_frames();
            if dropped > 0 {
                log::warn!("{} frames dropped while presenting", dropped);
            }
        }
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self
            .session
            .map_or(DriverState::Idle, |session| session.driver.state()))
    }
}

impl ApplicationHandler for LiveApp {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() || self.error.is_some() {
            return; // Already initialized
        }

        match self.open(event_loop) {
            Ok(session) => self.session = Some(session),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.request_stop(),
            WindowEvent::Resized(size) => {
                if let Some(session) = &mut self.session {
                    session.driver.sink_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape {
                    self.request_stop();
                } else if self.config.developer() {
                    if let Some(seek) = seek_for_key(code) {
                        self.seek(seek);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.tick(event_loop),
            _ => {}
        }
    }
}

/// Developer timeline jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    By { delta: Duration, forward: bool },
    To(TimeIndex),
}

fn seek_for_key(code: KeyCode) -> Option<Seek> {
    let by = |secs, forward| Seek::By {
        delta: Duration::from_secs(secs),
        forward,
    };
    match code {
        KeyCode::ArrowLeft => Some(by(1, false)),
        KeyCode::ArrowRight => Some(by(1, true)),
        KeyCode::PageDown => Some(by(10, false)),
        KeyCode::PageUp => Some(by(10, true)),
        KeyCode::Home => Some(Seek::To(TimeIndex::ZERO)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn developer_keys_map_to_seeks() {
        assert_eq!(
            seek_for_key(KeyCode::ArrowRight),
            Some(Seek::By {
                delta: Duration::from_secs(1),
                forward: true
            })
        );
        assert_eq!(
            seek_for_key(KeyCode::PageDown),
            Some(Seek::By {
                delta: Duration::from_secs(10),
                forward: false
            })
        );
        assert_eq!(seek_for_key(KeyCode::Home), Some(Seek::To(TimeIndex::ZERO)));
        assert_eq!(seek_for_key(KeyCode::Space), None);
    }
}
