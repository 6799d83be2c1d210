//! Configuration management for the eye mouse application

use crate::{
    constants::{
        DEFAULT_BLINK_THRESHOLD, DEFAULT_CAMERA_INDEX, DEFAULT_CLICK_COOLDOWN_SECS,
        DEFAULT_DETECTION_THRESHOLD, DEFAULT_DOUBLE_BLINK_WINDOW_SECS, DEFAULT_FRAME_MARGIN,
        DEFAULT_NMS_THRESHOLD, DEFAULT_PRESENCE_THRESHOLD, DEFAULT_ROI_EXPANSION,
        DEFAULT_SMOOTHING_FACTOR,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture device settings
    pub camera: CameraConfig,

    /// Camera to screen mapping
    pub mapping: MappingConfig,

    /// Pointer smoothing
    pub smoothing: SmoothingConfig,

    /// Blink gestures
    pub blink: BlinkConfig,

    /// Face detector and landmark model
    pub model: ModelConfig,

    /// Preview window
    pub preview: PreviewConfig,
}

/// Capture device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Mirror frames horizontally before tracking
    pub mirror: bool,
}

/// Camera to screen mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Pixels on each frame edge excluded from the mapping domain
    pub frame_margin: f64,
}

/// Pointer smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Damping divisor, at least 1; larger is smoother but laggier
    pub factor: f64,
}

/// Blink gestures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Aperture below which the eye counts as closed
    pub threshold: f64,

    /// Minimum seconds between two clicks
    pub click_cooldown_secs: f64,

    /// Maximum seconds between two fired blinks for the close window action
    pub double_blink_window_secs: f64,
}

/// Face detector and landmark model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the SCRFD face detector ONNX model
    pub face_detector: PathBuf,

    /// Path to the face mesh ONNX model
    pub face_mesh: PathBuf,

    /// Detector score below which a face box is dropped
    pub detection_threshold: f32,

    /// IoU above which overlapping face boxes are merged
    pub nms_threshold: f32,

    /// Share of the face box added on each side before cropping
    pub roi_expansion: f32,

    /// Face presence score below which a frame has no face
    pub presence_threshold: f32,
}

/// Preview window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Show the camera feed with the gaze marker
    pub enabled: bool,

    /// Window title
    pub window_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            mapping: MappingConfig::default(),
            smoothing: SmoothingConfig::default(),
            blink: BlinkConfig::default(),
            model: ModelConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_CAMERA_INDEX,
            mirror: true,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            frame_margin: DEFAULT_FRAME_MARGIN,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BLINK_THRESHOLD,
            click_cooldown_secs: DEFAULT_CLICK_COOLDOWN_SECS,
            double_blink_window_secs: DEFAULT_DOUBLE_BLINK_WINDOW_SECS,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_mesh: PathBuf::from("assets/face_mesh.onnx"),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            roi_expansion: DEFAULT_ROI_EXPANSION,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_title: "Eye Controlled Mouse".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the text is not valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// Model file existence is left to model loading.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !self.smoothing.factor.is_finite() || self.smoothing.factor < 1.0 {
            return Err(Error::ConfigError(format!(
                "Smoothing factor must be at least 1, got {}",
                self.smoothing.factor
            )));
        }

        if !self.mapping.frame_margin.is_finite() || self.mapping.frame_margin < 0.0 {
            return Err(Error::ConfigError(format!(
                "Frame margin must be non-negative, got {}",
                self.mapping.frame_margin
            )));
        }

        if !self.blink.threshold.is_finite() {
            return Err(Error::ConfigError("Blink threshold must be finite".to_string()));
        }

        for (name, secs) in [
            ("Click cooldown", self.blink.click_cooldown_secs),
            ("Double blink window", self.blink.double_blink_window_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be a non-negative number of seconds, got {secs}"
                )));
            }
        }

        for (name, value) in [
            ("Detection threshold", self.model.detection_threshold),
            ("NMS threshold", self.model.nms_threshold),
            ("Presence threshold", self.model.presence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfigError(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        if !self.model.roi_expansion.is_finite() || self.model.roi_expansion < 0.0 {
            return Err(Error::ConfigError(format!(
                "ROI expansion must be non-negative, got {}",
                self.model.roi_expansion
            )));
        }

        if self.camera.index < 0 {
            return Err(Error::ConfigError(format!(
                "Camera index must be non-negative, got {}",
                self.camera.index
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Eye Mouse Configuration

# Capture device
camera:
  index: 0
  mirror: true

# Camera to screen mapping
mapping:
  frame_margin: 50.0

# Pointer smoothing (>= 1, larger is smoother)
smoothing:
  factor: 5.0

# Blink gestures
blink:
  threshold: 0.004
  click_cooldown_secs: 1.0
  double_blink_window_secs: 1.0

# Face detector and landmark model
model:
  face_detector: "assets/face_detector.onnx"
  face_mesh: "assets/face_mesh.onnx"
  detection_threshold: 0.5
  nms_threshold: 0.4
  roi_expansion: 0.25
  presence_threshold: 0.5

# Preview window
preview:
  enabled: true
  window_title: "Eye Controlled Mouse"
"#;
