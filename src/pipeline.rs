//! Per-frame processing: gaze to pointer, blink to click.
//!
//! All state that survives between frames lives in [`SessionState`], which
//! the caller owns and passes into every [`FramePipeline::process_frame`]
//! call. The pipeline itself is immutable.

use crate::{
    blink_detector::{BlinkDetector, BlinkReading},
    click_state::{ClickAction, ClickStateMachine},
    cursor_control::{ActionSink, CursorSink},
    filters::{damping::DampingFilter, CursorFilter},
    gaze_mapper::{FrameSize, GazeMapper},
    landmarks::FrameLandmarks,
    Result,
};
use log::debug;
use std::time::Duration;

/// Mutable session state carried across frames
#[derive(Debug, Clone)]
pub struct SessionState {
    pub cursor: DampingFilter,
    pub clicks: ClickStateMachine,
}

impl SessionState {
    #[must_use]
    pub const fn new(cursor: DampingFilter, clicks: ClickStateMachine) -> Self {
        Self { cursor, clicks }
    }
}

/// What happened for one frame with a face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Tracked iris point in frame pixels
    pub gaze_pixel: (i32, i32),
    /// Mapped target before smoothing
    pub target: (f64, f64),
    /// Smoothed pointer position sent to the cursor sink
    pub cursor: (f64, f64),
    /// Eye classification
    pub blink: BlinkReading,
    /// Action sent to the action sink
    pub action: ClickAction,
}

/// Stateless per-frame pipeline
#[derive(Debug, Clone, Copy)]
pub struct FramePipeline {
    mapper: GazeMapper,
    blink: BlinkDetector,
}

impl FramePipeline {
    #[must_use]
    pub const fn new(mapper: GazeMapper, blink: BlinkDetector) -> Self {
        Self { mapper, blink }
    }

    #[must_use]
    pub const fn mapper(&self) -> &GazeMapper {
        &self.mapper
    }

    /// Process one frame's landmarks taken at `now`
    ///
    /// `None` landmarks mean no face: nothing is touched and `Ok(None)` is
    /// returned.
    ///
    /// The pointer branch (smoother, cursor sink) and the blink branch (click
    /// timers, action sink) both run even when the other one's sink fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if the set is missing required points, in
    /// which case no state changes. Otherwise returns the first sink error,
    /// cursor before action, after both branches updated their state.
    pub fn process_frame<C, A>(
        &self,
        state: &mut SessionState,
        landmarks: Option<&FrameLandmarks>,
        frame: FrameSize,
        now: Duration,
        cursor_sink: &mut C,
        action_sink: &mut A,
    ) -> Result<Option<FrameReport>>
    where
        C: CursorSink + ?Sized,
        A: ActionSink + ?Sized,
    {
        let Some(landmarks) = landmarks else {
            return Ok(None);
        };

        // Resolve every landmark up front so a bad set leaves state alone
        let gaze = landmarks.gaze_point()?;
        let blink = self.blink.classify(landmarks)?;
        let (gaze_pixel, target) = self.mapper.map_landmark(gaze, frame)?;

        let cursor = state.cursor.apply(target.0, target.1);
        let moved = cursor_sink.move_to(cursor.0, cursor.1);

        let action = state.clicks.update(blink.closed, now);
        let acted = Self::dispatch(action, action_sink);

        moved?;
        acted?;

        debug!(
            "gaze px {:?} target ({:.1}, {:.1}) cursor ({:.1}, {:.1}) aperture {:.4}",
            gaze_pixel, target.0, target.1, cursor.0, cursor.1, blink.aperture
        );

        Ok(Some(FrameReport {
            gaze_pixel,
            target,
            cursor,
            blink,
            action,
        }))
    }

    fn dispatch<A: ActionSink + ?Sized>(action: ClickAction, action_sink: &mut A) -> Result<()> {
        if action.clicks() {
            action_sink.click()?;
        }
        if action.secondary() {
            action_sink.close_window()?;
        }
        Ok(())
    }
}
