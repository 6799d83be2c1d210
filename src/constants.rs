//! Constants used throughout the application

/// Number of points produced by the face mesh model with iris refinement
pub const NUM_FACE_MESH_LANDMARKS: usize = 478;

/// Lower lid of the tracked eye (aperture metric)
pub const EYE_LOWER_LID: usize = 145;

/// Upper lid of the tracked eye (aperture metric)
pub const EYE_UPPER_LID: usize = 159;

/// Iris landmark range of the tracked eye
pub const IRIS_RANGE: std::ops::Range<usize> = 474..478;

/// Position inside `IRIS_RANGE` used as the gaze point
pub const IRIS_GAZE_OFFSET: usize = 1;

/// Default camera device index
pub const DEFAULT_CAMERA_INDEX: i32 = 0;

/// Default smoothing divisor
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 5.0;

/// Default aperture cutoff below which the eye counts as closed
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.004;

/// Default minimum gap between two clicks, in seconds
pub const DEFAULT_CLICK_COOLDOWN_SECS: f64 = 1.0;

/// Default window for the double blink gesture, in seconds
pub const DEFAULT_DOUBLE_BLINK_WINDOW_SECS: f64 = 1.0;

/// Default frame margin in pixels excluded from the mapping domain
pub const DEFAULT_FRAME_MARGIN: f64 = 50.0;

/// Default face presence score cutoff
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;

/// Default face detector score cutoff
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;

/// Default IoU above which overlapping face boxes are merged
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Default share of the face box added on each side before cropping
pub const DEFAULT_ROI_EXPANSION: f32 = 0.25;

/// Smallest face crop edge, in pixels, worth running the mesh on
pub const MIN_FACE_ROI_SIDE: i32 = 16;

/// Face mesh model input edge length
pub const FACE_MESH_INPUT_SIZE: i32 = 192;

/// Preview marker radius in pixels
pub const GAZE_MARKER_RADIUS: i32 = 3;

/// Key codes that end the session from the preview window
pub const EXIT_KEY_Q: i32 = b'q' as i32;
pub const EXIT_KEY_ESC: i32 = 27;
