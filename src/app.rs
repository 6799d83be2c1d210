//! Main application module: wiring and the supervisory frame loop.

use crate::{
    blink_detector::BlinkDetector,
    capture::{Camera, FrameDimensions, FrameSource, Grab, VideoSource},
    click_state::ClickStateMachine,
    config::Config,
    cursor_control::{ActionSink, CursorSink, X11Controller},
    error::Result,
    filters::damping::DampingFilter,
    gaze_mapper::{GazeMapper, ScreenBounds},
    face_detection::FaceDetector,
    landmarks::{FaceLandmarker, FaceMeshDetector, LandmarkSource},
    pipeline::{FramePipeline, SessionState},
    preview::{Headless, PreviewSurface, PreviewWindow},
    utils::secs_to_duration,
};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Why the frame loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Exit key or preview window closed
    UserExit,
    /// Interrupt signal received
    Interrupted,
    /// The frame source ran out (video file)
    EndOfStream,
    /// An unrecoverable per-frame error
    Fault,
}

impl ShutdownReason {
    /// Process exit code for this shutdown
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Fault => 1,
            Self::UserExit | Self::Interrupted | Self::EndOfStream => 0,
        }
    }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub frames_without_face: u64,
    pub capture_failures: u64,
    pub clicks: u64,
    pub secondary_actions: u64,
    pub reason: ShutdownReason,
}

impl SessionSummary {
    const fn new() -> Self {
        Self {
            frames: 0,
            frames_without_face: 0,
            capture_failures: 0,
            clicks: 0,
            secondary_actions: 0,
            reason: ShutdownReason::UserExit,
        }
    }
}

/// Monotonic time since session start
pub trait SessionClock {
    fn now(&self) -> Duration;
}

/// Wall clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl SessionClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// External collaborators the loop drives
pub struct Collaborators<'a, S, L, C, A, P> {
    pub capture: &'a mut S,
    pub landmarks: &'a mut L,
    pub cursor: &'a mut C,
    pub actions: &'a mut A,
    pub preview: &'a mut P,
}

/// Run frames until a shutdown trigger fires
///
/// Capture hiccups are logged and skipped, frames without a face are
/// skipped silently, and any other error is logged and ends the session
/// with [`ShutdownReason::Fault`]. Resource cleanup belongs to the
/// collaborators' `Drop` impls, so it runs once whatever the reason.
pub fn run_session<S, L, C, A, P, K>(
    pipeline: &FramePipeline,
    state: &mut SessionState,
    io: Collaborators<'_, S, L, C, A, P>,
    clock: &K,
    shutdown: &AtomicBool,
) -> SessionSummary
where
    S: FrameSource,
    L: LandmarkSource<Frame = S::Frame>,
    C: CursorSink,
    A: ActionSink,
    P: PreviewSurface<S::Frame>,
    K: SessionClock,
{
    let Collaborators {
        capture,
        landmarks,
        cursor,
        actions,
        preview,
    } = io;
    let mut summary = SessionSummary::new();

    summary.reason = loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("Interrupted by user");
            break ShutdownReason::Interrupted;
        }

        let frame = match capture.grab() {
            Ok(Grab::Frame(frame)) => frame,
            Ok(Grab::Failed) => {
                summary.capture_failures += 1;
                warn!("Frame not captured");
                continue;
            }
            Ok(Grab::EndOfStream) => {
                info!("End of video stream reached");
                break ShutdownReason::EndOfStream;
            }
            Err(e) if e.is_transient() => {
                summary.capture_failures += 1;
                warn!("Frame not captured: {e}");
                continue;
            }
            Err(e) => {
                error!("Capture failed: {e}");
                break ShutdownReason::Fault;
            }
        };
        summary.frames += 1;

        let step = match landmarks.process(&frame) {
            Ok(found) => pipeline.process_frame(
                state,
                found.as_ref(),
                frame.frame_size(),
                clock.now(),
                cursor,
                actions,
            ),
            Err(e) => Err(e),
        };

        let marker = match step {
            Ok(Some(report)) => {
                if report.action.clicks() {
                    summary.clicks += 1;
                    info!("Single click triggered");
                }
                if report.action.secondary() {
                    summary.secondary_actions += 1;
                    info!("Double blink, close window triggered");
                }
                Some(report.gaze_pixel)
            }
            Ok(None) => {
                summary.frames_without_face += 1;
                debug!("No face in frame {}", summary.frames);
                None
            }
            Err(e) => {
                error!("Runtime error on frame {}: {e}", summary.frames);
                break ShutdownReason::Fault;
            }
        };

        let exit = match preview.show(&frame, marker) {
            Ok(()) => preview.poll_exit(),
            Err(e) => Err(e),
        };
        match exit {
            Ok(true) => break ShutdownReason::UserExit,
            Ok(false) => {}
            Err(e) => {
                error!("Preview failed: {e}");
                break ShutdownReason::Fault;
            }
        }
    };

    info!(
        "Session ended ({:?}): {} frames, {} without face, {} capture failures, {} clicks, {} double blinks",
        summary.reason,
        summary.frames,
        summary.frames_without_face,
        summary.capture_failures,
        summary.clicks,
        summary.secondary_actions
    );
    summary
}

/// Build the pipeline and initial session state from configuration
///
/// # Errors
///
/// Returns an error for invalid smoothing, timing or mapping settings.
pub fn build_pipeline(config: &Config, screen: ScreenBounds) -> Result<(FramePipeline, SessionState)> {
    let mapper = GazeMapper::new(screen, config.mapping.frame_margin)?;
    let blink = BlinkDetector::new(config.blink.threshold);
    let smoother = DampingFilter::new(config.smoothing.factor)?;
    let clicks = ClickStateMachine::new(
        secs_to_duration(config.blink.click_cooldown_secs, "click cooldown")?,
        secs_to_duration(config.blink.double_blink_window_secs, "double blink window")?,
    );

    if !clicks.secondary_reachable() {
        warn!(
            "Double blink window ({}s) does not exceed the click cooldown ({}s); the close window gesture cannot fire",
            config.blink.double_blink_window_secs, config.blink.click_cooldown_secs
        );
    }

    Ok((FramePipeline::new(mapper, blink), SessionState::new(smoother, clicks)))
}

/// Fully initialized application
pub struct EyeMouseApp {
    camera: Camera,
    detector: FaceLandmarker,
    controller: X11Controller,
    preview: Option<PreviewWindow>,
    pipeline: FramePipeline,
    state: SessionState,
}

impl EyeMouseApp {
    /// Open every device and load the models
    ///
    /// # Errors
    ///
    /// Returns an error if the camera, model, X display or preview window
    /// cannot be initialized, or the configuration is invalid.
    pub fn new(config: &Config, source: &VideoSource) -> Result<Self> {
        info!("Initializing eye mouse controller");
        config.validate()?;

        let camera = Camera::open(source, config.camera.mirror)?;
        let detector = FaceLandmarker::new(
            FaceDetector::new(
                &config.model.face_detector,
                config.model.detection_threshold,
                config.model.nms_threshold,
            )?,
            FaceMeshDetector::new(&config.model.face_mesh, config.model.presence_threshold)?,
            config.model.roi_expansion,
        );
        let controller = X11Controller::new()?;
        let (pipeline, state) = build_pipeline(config, controller.screen_bounds())?;

        let preview = if config.preview.enabled {
            Some(PreviewWindow::new(&config.preview.window_title)?)
        } else {
            None
        };

        info!("Eye mouse controller initialized");
        Ok(Self {
            camera,
            detector,
            controller,
            preview,
            pipeline,
            state,
        })
    }

    /// Run until shutdown; devices are released when `self` is dropped
    pub fn run(&mut self, shutdown: &AtomicBool) -> SessionSummary {
        info!("Starting main loop");
        let clock = MonotonicClock::start();
        let mut cursor = &self.controller;
        let mut actions = &self.controller;
        match self.preview.as_mut() {
            Some(window) => run_session(
                &self.pipeline,
                &mut self.state,
                Collaborators {
                    capture: &mut self.camera,
                    landmarks: &mut self.detector,
                    cursor: &mut cursor,
                    actions: &mut actions,
                    preview: window,
                },
                &clock,
                shutdown,
            ),
            None => run_session(
                &self.pipeline,
                &mut self.state,
                Collaborators {
                    capture: &mut self.camera,
                    landmarks: &mut self.detector,
                    cursor: &mut cursor,
                    actions: &mut actions,
                    preview: &mut Headless,
                },
                &clock,
                shutdown,
            ),
        }
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to a flag checked once per frame
///
/// # Errors
///
/// Returns `Error::Io` if a handler cannot be installed.
pub fn install_interrupt_handler() -> Result<&'static AtomicBool> {
    let handler = request_shutdown as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store.
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(&SHUTDOWN_REQUESTED)
}
