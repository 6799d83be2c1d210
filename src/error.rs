//! Error types for the eye mouse library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture device could not be opened
    #[error("Camera error: {0}")]
    Camera(String),

    /// Pointer or keyboard injection failed
    #[error("Input injection error: {0}")]
    InputInjection(String),

    /// Landmark set does not match the expected topology
    #[error("Landmark error: {0}")]
    Landmarks(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Filter initialization or processing error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether a per-frame error can be skipped without stopping the session.
    ///
    /// Only capture hiccups qualify; everything else is a fault that ends the
    /// loop through the normal cleanup path.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Camera(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
