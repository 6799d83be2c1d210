//! Per-frame eye closure classification.
//!
//! The aperture metric is the vertical distance from the upper lid landmark
//! down to the lower lid landmark of one eye, in normalized image units. Each
//! frame is classified on its own: there is no hysteresis, so a blink lasting
//! several frames produces several consecutive closed readings. Debouncing
//! happens in [`crate::click_state`].

use crate::{landmarks::FrameLandmarks, Result};

/// Classification of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkReading {
    /// Lower lid y minus upper lid y
    pub aperture: f64,
    /// Whether the aperture fell below the threshold
    pub closed: bool,
}

/// Stateless eye closure classifier
#[derive(Debug, Clone, Copy)]
pub struct BlinkDetector {
    threshold: f64,
}

impl BlinkDetector {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Aperture metric for a landmark set
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if the lid points are missing.
    pub fn aperture(landmarks: &FrameLandmarks) -> Result<f64> {
        let (lower, upper) = landmarks.eye_lids()?;
        Ok(f64::from(lower.y) - f64::from(upper.y))
    }

    /// Classify a frame as eye open or closed
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if the lid points are missing.
    pub fn classify(&self, landmarks: &FrameLandmarks) -> Result<BlinkReading> {
        let aperture = Self::aperture(landmarks)?;
        Ok(BlinkReading {
            aperture,
            closed: aperture < self.threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{EYE_LOWER_LID, EYE_UPPER_LID, NUM_FACE_MESH_LANDMARKS},
        landmarks::Landmark,
    };

    fn face_with_lids(upper_y: f32, lower_y: f32) -> FrameLandmarks {
        let mut points = vec![Landmark::default(); NUM_FACE_MESH_LANDMARKS];
        points[EYE_UPPER_LID] = Landmark::new(0.4, upper_y, 0.0);
        points[EYE_LOWER_LID] = Landmark::new(0.4, lower_y, 0.0);
        FrameLandmarks::new(points)
    }

    #[test]
    fn test_open_eye() {
        let reading = BlinkDetector::new(0.004).classify(&face_with_lids(0.40, 0.42)).unwrap();
        assert!(!reading.closed);
        assert!((reading.aperture - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_closed_eye() {
        let reading = BlinkDetector::new(0.004).classify(&face_with_lids(0.400, 0.402)).unwrap();
        assert!(reading.closed);
    }

    #[test]
    fn test_inverted_lids_count_as_closed() {
        let reading = BlinkDetector::new(0.004).classify(&face_with_lids(0.42, 0.40)).unwrap();
        assert!(reading.aperture < 0.0);
        assert!(reading.closed);
    }

    #[test]
    fn test_threshold_is_strict() {
        let lm = face_with_lids(0.25, 0.5);
        let aperture = BlinkDetector::aperture(&lm).unwrap();
        assert!(!BlinkDetector::new(aperture).classify(&lm).unwrap().closed);
    }

    #[test]
    fn test_deterministic() {
        let detector = BlinkDetector::new(0.004);
        let lm = face_with_lids(0.400, 0.403);
        let first = detector.classify(&lm).unwrap();
        for _ in 0..10 {
            assert_eq!(detector.classify(&lm).unwrap(), first);
        }
    }

    #[test]
    fn test_missing_lids() {
        let lm = FrameLandmarks::new(vec![Landmark::default(); 10]);
        assert!(BlinkDetector::new(0.004).classify(&lm).is_err());
    }
}
