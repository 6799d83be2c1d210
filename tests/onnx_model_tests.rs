//! Tests for face detector and face mesh model loading and inference

use eye_mouse::{
    constants::NUM_FACE_MESH_LANDMARKS,
    face_detection::FaceDetector,
    landmarks::{FaceLandmarker, FaceMeshDetector, LandmarkSource},
    Result,
};
use opencv::core::{Mat, Scalar, CV_8UC3};
use std::path::Path;

const DETECTOR_PATH: &str = "assets/face_detector.onnx";
const MESH_PATH: &str = "assets/face_mesh.onnx";

fn landmarker() -> Result<FaceLandmarker> {
    Ok(FaceLandmarker::new(
        FaceDetector::new(DETECTOR_PATH, 0.5, 0.4)?,
        FaceMeshDetector::new(MESH_PATH, 0.5)?,
        0.25,
    ))
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_load_models() -> Result<()> {
    assert!(Path::new(DETECTOR_PATH).exists(), "Face detector model not found");
    assert!(Path::new(MESH_PATH).exists(), "Face mesh model not found");

    let _landmarker = landmarker()?;

    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_blank_frame_has_no_face() -> Result<()> {
    let mut landmarker = landmarker()?;
    let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::new(128.0, 128.0, 128.0, 0.0))?;

    assert!(landmarker.process(&frame)?.is_none());

    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_mesh_on_crop_yields_full_set() -> Result<()> {
    let mut mesh = FaceMeshDetector::new(MESH_PATH, 0.0)?;
    let crop = Mat::new_rows_cols_with_default(200, 200, CV_8UC3, Scalar::new(128.0, 128.0, 128.0, 0.0))?;

    if let Some(landmarks) = mesh.infer(&crop)? {
        assert_eq!(landmarks.len(), NUM_FACE_MESH_LANDMARKS);
        assert!(landmarks.points().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    Ok(())
}

#[test]
#[ignore = "Requires ONNX Runtime"]
fn test_missing_model_fails() {
    assert!(FaceMeshDetector::new("assets/does_not_exist.onnx", 0.5).is_err());
    assert!(FaceDetector::new("assets/does_not_exist.onnx", 0.5, 0.4).is_err());
}
