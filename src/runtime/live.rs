//! Continuous runtime: a window whose redraws pump a per-frame callback.
//!
//! [`FrameLoop`] owns at most one callback. Deregistering drops it, after
//! which pumping is a no-op; the live app uses this to pause and resume.

use std::sync::Arc;
use std::time::Instant;

use image::Rgba32FImage;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use super::RuntimeError;
use crate::audio::{AudioInput, AudioSystem};
use crate::compositor::frame_to_rgba8;
use crate::params::{audio_constants, JobParams, RenderConfig};
use crate::profile::{Environment, Profile};
use crate::rendering::RenderSystem;
use crate::session::RenderSession;

/// Work done once per displayed frame
pub trait FrameCallback {
    /// `now_ms` is a monotonic wall-clock timestamp
    fn on_frame(&mut self, now_ms: f64);
}

impl<F: FnMut(f64)> FrameCallback for F {
    fn on_frame(&mut self, now_ms: f64) {
        self(now_ms)
    }
}

/// Holder for the per-frame callback
pub struct FrameLoop<C> {
    callback: Option<C>,
}

impl<C: FrameCallback> Default for FrameLoop<C> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<C: FrameCallback> FrameLoop<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a callback, returning any previous one
    pub fn register(&mut self, callback: C) -> Option<C> {
        self.callback.replace(callback)
    }

    /// Remove the callback; nothing runs on later pumps
    pub fn deregister(&mut self) -> Option<C> {
        self.callback.take()
    }

    pub fn is_registered(&self) -> bool {
        self.callback.is_some()
    }

    pub fn callback_mut(&mut self) -> Option<&mut C> {
        self.callback.as_mut()
    }

    /// Run one frame if a callback is registered; returns whether it ran
    pub fn pump(&mut self, now_ms: f64) -> bool {
        match self.callback.as_mut() {
            Some(callback) => {
                callback.on_frame(now_ms);
                true
            }
            None => false,
        }
    }
}

/// Live runtime settings
pub struct LiveOptions {
    /// Must be resolved for the continuous environment
    pub profile: Profile,
    pub job: JobParams,
    pub subject: Rgba32FImage,
    pub input: AudioInput,
    pub render_config: RenderConfig,
}

/// Everything one displayed frame touches
struct LiveFrame {
    session: RenderSession,
    audio: AudioSystem,
    presenter: RenderSystem,
}

impl FrameCallback for LiveFrame {
    fn on_frame(&mut self, now_ms: f64) {
        let window = self.audio.latest_window();
        let frame = frame_to_rgba8(self.session.render_frame(&window, now_ms));
        self.presenter.upload(&frame);

        match self.presenter.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.presenter.reconfigure();
            }
            Err(wgpu::SurfaceError::Timeout) => warn!("Surface timeout, frame dropped"),
            Err(e) => error!("Render error: {:?}", e),
        }
    }
}

/// Winit application state
struct LiveApp {
    options: Option<LiveOptions>,
    window: Option<Arc<Window>>,
    frame_loop: FrameLoop<LiveFrame>,

    /// Callback parked while paused
    paused: Option<LiveFrame>,

    start_time: Instant,
    failure: Option<RuntimeError>,
}

impl LiveApp {
    fn new(options: LiveOptions) -> Self {
        Self {
            options: Some(options),
            window: None,
            frame_loop: FrameLoop::new(),
            paused: None,
            start_time: Instant::now(),
            failure: None,
        }
    }

    fn now_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RuntimeError> {
        let Some(options) = self.options.take() else {
            return Ok(());
        };
        let config = options.render_config;

        let window_attributes = Window::default_attributes()
            .with_title(format!("Pulsetrail - {}", options.profile.name))
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window_width,
                config.window_height,
            ));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let presenter = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            config.frame_width,
            config.frame_height,
        ))?;

        let audio = AudioSystem::start(
            options.input,
            &options.profile,
            audio_constants::DEFAULT_UPDATE_INTERVAL_MS,
        )?;

        let session = RenderSession::new(
            options.profile,
            &options.job,
            options.subject,
            config.frame_width,
            config.frame_height,
        )?;

        self.frame_loop.register(LiveFrame {
            session,
            audio,
            presenter,
        });
        self.window = Some(window);

        info!("Live view running (Space: pause/resume, Esc: quit)");
        Ok(())
    }

    fn toggle_pause(&mut self) {
        if let Some(frame) = self.frame_loop.deregister() {
            info!("Paused");
            self.paused = Some(frame);
        } else if let Some(frame) = self.paused.take() {
            info!("Resumed");
            self.frame_loop.register(frame);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let presenter = match (self.frame_loop.callback_mut(), self.paused.as_mut()) {
            (Some(frame), _) | (None, Some(frame)) => &mut frame.presenter,
            (None, None) => return,
        };
        presenter.resize(width, height);
    }
}

impl ApplicationHandler for LiveApp {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init(event_loop) {
            error!("Live view failed to start: {}", e);
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => self.toggle_pause(),
                _ => {}
            },
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let now = self.now_ms();
                self.frame_loop.pump(now);
            }
            _ => {}
        }
    }
}

/// Open the live window and run until it is closed
pub fn run_live(options: LiveOptions) -> Result<(), RuntimeError> {
    if options.profile.environment != Environment::Continuous {
        return Err(RuntimeError::WrongEnvironment {
            expected: Environment::Continuous,
            actual: options.profile.environment,
        });
    }

    let event_loop = EventLoop::new()?;
    let mut app = LiveApp::new(options);
    event_loop.run_app(&mut app)?;

    // Drop the session and audio streams before returning
    app.frame_loop.deregister();
    app.paused = None;

    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::presets;
    use crate::runtime::ring_subject;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_pump_runs_only_while_registered() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut frame_loop = FrameLoop::new();

        assert!(!frame_loop.pump(0.0));

        let sink = Rc::clone(&calls);
        frame_loop.register(move |now: f64| sink.borrow_mut().push(now));
        assert!(frame_loop.pump(16.0));
        assert!(frame_loop.pump(33.0));

        assert!(frame_loop.deregister().is_some());
        assert!(!frame_loop.pump(50.0));
        assert!(!frame_loop.is_registered());

        assert_eq!(*calls.borrow(), vec![16.0, 33.0]);
    }

    #[test]
    fn test_deregistered_session_stops_advancing() {
        let profile = presets::classic().resolve(Environment::Continuous).unwrap();
        let session = RenderSession::new(profile, &JobParams::default(), ring_subject(16), 16, 9)
            .unwrap();
        let session = Rc::new(RefCell::new(session));

        let mut frame_loop = FrameLoop::new();
        let handle = Rc::clone(&session);
        let window = crate::audio::AnalysisWindow::silent(1024, 44100.0 / 2048.0);
        frame_loop.register(move |now: f64| {
            handle.borrow_mut().render_frame(&window, now);
        });

        frame_loop.pump(0.0);
        frame_loop.pump(33.3);
        frame_loop.deregister();
        frame_loop.pump(66.6);
        frame_loop.pump(99.9);

        let session = session.borrow();
        assert_eq!(session.frames_rendered(), 2);
        assert_eq!(session.state().trail_buffer_index, 0);
    }

    #[test]
    fn test_live_rejects_frame_indexed_profile() {
        let profile = presets::classic().resolve(Environment::FrameIndexed).unwrap();
        let options = LiveOptions {
            profile,
            job: JobParams::default(),
            subject: ring_subject(8),
            input: AudioInput::Synth,
            render_config: RenderConfig::default(),
        };
        assert!(matches!(
            run_live(options),
            Err(RuntimeError::WrongEnvironment { .. })
        ));
    }
}
