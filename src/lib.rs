//! Eye controlled mouse library for hands-free pointer input.
//!
//! A face mesh model yields iris and eyelid landmarks for every camera frame.
//! This library turns them into pointer control:
//! 1. The tracked iris point is mapped from camera pixels to screen pixels
//! 2. An exponential damping filter smooths the pointer trajectory
//! 3. The eyelid aperture classifies each frame as eye open or closed
//! 4. A cooldown and double blink state machine turns closures into clicks
//!
//! Camera, inference, input injection and preview are reached through small
//! traits so the per-frame pipeline runs unchanged against synthetic inputs.
//!
//! # Examples
//!
//! ## Processing one frame
//!
//! ```
//! use eye_mouse::{
//!     blink_detector::BlinkDetector,
//!     click_state::ClickStateMachine,
//!     cursor_control::{ActionSink, CursorSink},
//!     filters::damping::DampingFilter,
//!     gaze_mapper::{FrameSize, GazeMapper, ScreenBounds},
//!     landmarks::{FrameLandmarks, Landmark},
//!     pipeline::{FramePipeline, SessionState},
//! };
//! use std::time::Duration;
//!
//! struct Log(Vec<String>);
//!
//! impl CursorSink for Log {
//!     fn move_to(&mut self, x: f64, y: f64) -> eye_mouse::Result<()> {
//!         self.0.push(format!("move {x:.0} {y:.0}"));
//!         Ok(())
//!     }
//!     fn screen_bounds(&self) -> ScreenBounds {
//!         ScreenBounds::new(1920.0, 1080.0)
//!     }
//! }
//!
//! impl ActionSink for Log {
//!     fn click(&mut self) -> eye_mouse::Result<()> {
//!         self.0.push("click".into());
//!         Ok(())
//!     }
//!     fn close_window(&mut self) -> eye_mouse::Result<()> {
//!         self.0.push("close".into());
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> eye_mouse::Result<()> {
//! let mapper = GazeMapper::new(ScreenBounds::new(1920.0, 1080.0), 50.0)?;
//! let pipeline = FramePipeline::new(mapper, BlinkDetector::new(0.004));
//! let mut state = SessionState::new(
//!     DampingFilter::new(5.0)?,
//!     ClickStateMachine::new(Duration::from_secs(1), Duration::from_secs(1)),
//! );
//!
//! let landmarks = FrameLandmarks::new(vec![Landmark::new(0.5, 0.5, 0.0); 478]);
//! let mut cursor = Log(Vec::new());
//! let mut actions = Log(Vec::new());
//! let report = pipeline.process_frame(
//!     &mut state,
//!     Some(&landmarks),
//!     FrameSize::new(640, 480),
//!     Duration::ZERO,
//!     &mut cursor,
//!     &mut actions,
//! )?;
//!
//! // Both lids at the same height: the eye reads as closed and clicks
//! assert!(report.is_some());
//! assert_eq!(actions.0, vec!["click".to_string()]);
//! # Ok(())
//! # }
//! ```

/// Facial landmark sets and the face mesh inference source
pub mod landmarks;

/// SCRFD face box detection
pub mod face_detection;

/// Camera space to screen space mapping
pub mod gaze_mapper;

/// Pointer trajectory smoothing filters
pub mod filters;

/// Eye closure classification
pub mod blink_detector;

/// Click cooldown and double blink state machine
pub mod click_state;

/// Per-frame processing pipeline
pub mod pipeline;

/// Frame acquisition
pub mod capture;

/// Preview window
pub mod preview;

/// Pointer and click injection
pub mod cursor_control;

/// Numeric helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
