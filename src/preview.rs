//! Live preview window with the tracked gaze point overlay.

use crate::{
    constants::{EXIT_KEY_ESC, EXIT_KEY_Q, GAZE_MARKER_RADIUS},
    Result,
};
use log::{debug, info};
use opencv::{
    core::{Mat, Point, Scalar},
    highgui::{self, WINDOW_AUTOSIZE, WND_PROP_VISIBLE},
    imgproc::{self, LINE_8},
};

/// A surface that can show frames and report an exit request
pub trait PreviewSurface<F> {
    /// Show a frame, optionally marking the gaze pixel
    ///
    /// # Errors
    ///
    /// Returns an error if drawing or displaying fails.
    fn show(&mut self, frame: &F, marker: Option<(i32, i32)>) -> Result<()>;

    /// Pump window events and report whether the user asked to quit
    ///
    /// # Errors
    ///
    /// Returns an error if the window system fails.
    fn poll_exit(&mut self) -> Result<bool>;
}

/// No preview at all
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl<F> PreviewSurface<F> for Headless {
    fn show(&mut self, _frame: &F, _marker: Option<(i32, i32)>) -> Result<()> {
        Ok(())
    }

    fn poll_exit(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// OpenCV highgui window, destroyed on drop
pub struct PreviewWindow {
    title: String,
    shown: bool,
}

impl PreviewWindow {
    /// Create the preview window
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created.
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, WINDOW_AUTOSIZE)?;
        info!("Preview window '{}' created", title);
        Ok(Self {
            title: title.to_string(),
            shown: false,
        })
    }
}

impl PreviewSurface<Mat> for PreviewWindow {
    fn show(&mut self, frame: &Mat, marker: Option<(i32, i32)>) -> Result<()> {
        if let Some((x, y)) = marker {
            let mut display_frame = frame.clone();
            imgproc::circle(
                &mut display_frame,
                Point::new(x, y),
                GAZE_MARKER_RADIUS,
                Scalar::new(0.0, 255.0, 0.0, 0.0),
                -1,
                LINE_8,
                0,
            )?;
            highgui::imshow(&self.title, &display_frame)?;
        } else {
            highgui::imshow(&self.title, frame)?;
        }
        self.shown = true;
        Ok(())
    }

    fn poll_exit(&mut self) -> Result<bool> {
        let key = highgui::wait_key(1)?;
        if key == EXIT_KEY_Q || key == EXIT_KEY_ESC {
            info!("Exit requested by user");
            return Ok(true);
        }
        // Closing the window through the window manager hides it
        if self.shown && highgui::get_window_property(&self.title, WND_PROP_VISIBLE)? < 1.0 {
            info!("Preview window closed");
            return Ok(true);
        }
        Ok(false)
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        match highgui::destroy_window(&self.title) {
            Ok(()) => debug!("Preview window destroyed"),
            Err(e) => log::error!("Failed to destroy preview window: {e}"),
        }
    }
}
