//! Frame acquisition.

use crate::{error::Error, gaze_mapper::FrameSize, Result};
use log::{debug, info};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Result of one acquisition attempt
#[derive(Debug)]
pub enum Grab<F> {
    /// A frame was captured
    Frame(F),
    /// This attempt produced nothing; the next one may succeed
    Failed,
    /// The source has no more frames
    EndOfStream,
}

/// Anything with pixel dimensions
pub trait FrameDimensions {
    fn frame_size(&self) -> FrameSize;
}

impl FrameDimensions for Mat {
    fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.cols(), self.rows())
    }
}

/// Blocking frame producer
pub trait FrameSource {
    type Frame: FrameDimensions;

    /// Block until the next frame is available
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails in a way a retry will not fix.
    fn grab(&mut self) -> Result<Grab<Self::Frame>>;
}

/// OpenCV capture device, released on drop
pub struct Camera {
    capture: VideoCapture,
    is_file: bool,
    mirror: bool,
}

impl Camera {
    /// Open a camera or video file
    ///
    /// # Errors
    ///
    /// Returns `Error::Camera` if the device cannot be opened.
    pub fn open(source: &VideoSource, mirror: bool) -> Result<Self> {
        let (mut capture, is_file) = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {}", index);
                (VideoCapture::new(*index, videoio::CAP_ANY)?, false)
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path);
                (VideoCapture::from_file(path, videoio::CAP_ANY)?, true)
            }
        };

        if !capture.is_opened()? {
            return Err(Error::Camera(format!("{source:?} could not be opened")));
        }

        if !is_file {
            // Reduce buffer size for lower latency (webcam only)
            capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;
        }

        Ok(Self {
            capture,
            is_file,
            mirror,
        })
    }
}

impl FrameSource for Camera {
    type Frame = Mat;

    fn grab(&mut self) -> Result<Grab<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(if self.is_file {
                Grab::EndOfStream
            } else {
                Grab::Failed
            });
        }

        if self.mirror {
            let mut flipped = Mat::default();
            opencv::core::flip(&frame, &mut flipped, 1)?;
            frame = flipped;
        }

        Ok(Grab::Frame(frame))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => debug!("Capture device released"),
            Err(e) => log::error!("Failed to release capture device: {e}"),
        }
    }
}
