//! Facial landmark sets and the sources that produce them.
//!
//! The core only ever sees a [`FrameLandmarks`]: an ordered list of points in
//! normalized image coordinates (`0.0..=1.0` on each axis, `z` in the same
//! scale as `x`). Indices follow the 478-point face mesh topology with iris
//! refinement and are used positionally, see [`crate::constants`].
//!
//! [`FaceLandmarker`] is the production source: it finds the face box with
//! [`FaceDetector`], runs the mesh model on the square crop and maps the
//! points back into full-frame coordinates.

use crate::{
    constants::{
        EYE_LOWER_LID, EYE_UPPER_LID, FACE_MESH_INPUT_SIZE, IRIS_GAZE_OFFSET, IRIS_RANGE,
        MIN_FACE_ROI_SIDE, NUM_FACE_MESH_LANDMARKS,
    },
    error::Error,
    face_detection::FaceDetector,
    gaze_mapper::FrameSize,
    utils::refine_box,
    Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::{
    core::{Mat, Rect, Size, Vec3f, CV_32F},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// A single normalized landmark
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Landmarks detected in one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameLandmarks {
    points: Vec<Landmark>,
}

impl FrameLandmarks {
    #[must_use]
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Landmark at a topology index
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if the set is too short for `index`.
    pub fn get(&self, index: usize) -> Result<Landmark> {
        self.points.get(index).copied().ok_or_else(|| {
            Error::Landmarks(format!(
                "landmark {index} requested but only {} points present",
                self.points.len()
            ))
        })
    }

    /// The iris point used as the tracked gaze position
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if the iris points are missing.
    pub fn gaze_point(&self) -> Result<Landmark> {
        let iris = self.points.get(IRIS_RANGE).ok_or_else(|| {
            Error::Landmarks(format!(
                "iris landmarks {}..{} missing, got {} points",
                IRIS_RANGE.start,
                IRIS_RANGE.end,
                self.points.len()
            ))
        })?;
        Ok(iris[IRIS_GAZE_OFFSET])
    }

    /// Lower and upper lid of the tracked eye
    ///
    /// # Errors
    ///
    /// Returns `Error::Landmarks` if either lid point is missing.
    pub fn eye_lids(&self) -> Result<(Landmark, Landmark)> {
        Ok((self.get(EYE_LOWER_LID)?, self.get(EYE_UPPER_LID)?))
    }
}

/// Anything that turns a captured frame into landmarks
pub trait LandmarkSource {
    /// Frame type this source consumes
    type Frame;

    /// Run inference on one frame. `Ok(None)` means no face was found.
    ///
    /// # Errors
    ///
    /// Returns an error if inference itself fails.
    fn process(&mut self, frame: &Self::Frame) -> Result<Option<FrameLandmarks>>;
}

/// Face mesh landmark model using `ONNX` Runtime
///
/// Expects a face mesh model with iris refinement taking a `1x192x192x3` RGB
/// tensor in `[0, 1]` holding a face crop. One output must hold at least `478 * 3` values in
/// input pixel units; an optional single-value output is read as the face
/// presence logit.
pub struct FaceMeshDetector {
    session: Session,
    presence_threshold: f32,
}

impl FaceMeshDetector {
    /// Load the model and prepare an inference session
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no outputs.
    pub fn new<P: AsRef<Path>>(model_path: P, presence_threshold: f32) -> Result<Self> {
        info!(
            "Initializing FaceMeshDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            presence_threshold,
        })
    }

    /// Run the mesh on a BGR face crop
    ///
    /// Points come back normalized to the crop. `Ok(None)` means the presence
    /// score was below the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing, inference or output decoding fails.
    pub fn infer(&mut self, face: &Mat) -> Result<Option<FrameLandmarks>> {
        let input = Self::preprocess(face)?;
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let mut raw = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let tensor = output.try_extract::<f32>()?;
            let view = tensor.view();
            raw.push(view.iter().copied().collect::<Vec<f32>>());
        }

        let (mesh, presence) = Self::split_outputs(raw)?;
        if presence < self.presence_threshold {
            debug!("Face presence {presence:.3} below threshold");
            return Ok(None);
        }

        Ok(Some(landmarks_from_mesh(&mesh)))
    }

    /// Resize, convert to RGB and normalize a BGR crop into an NHWC tensor
    #[allow(clippy::cast_sign_loss)] // input size is a positive constant
    fn preprocess(frame: &Mat) -> Result<Array4<f32>> {
        let size = FACE_MESH_INPUT_SIZE as usize;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(FACE_MESH_INPUT_SIZE, FACE_MESH_INPUT_SIZE),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let pixels = float_image.data_typed::<Vec3f>()?;
        let data: Vec<f32> = pixels.iter().flat_map(|px| [px[0], px[1], px[2]]).collect();

        Array4::from_shape_vec((1, size, size, 3), data)
            .map_err(|e| Error::ModelOutputError(format!("Failed to create input array: {e}")))
    }

    /// Split raw model outputs into landmark values and a presence score
    fn split_outputs(outputs: Vec<Vec<f32>>) -> Result<(Vec<f32>, f32)> {
        let mut mesh = None;
        let mut presence = 1.0_f32;
        for output in outputs {
            if output.len() >= NUM_FACE_MESH_LANDMARKS * 3 && mesh.is_none() {
                mesh = Some(output);
            } else if output.len() == 1 {
                presence = sigmoid(output[0]);
            }
        }
        let mesh = mesh.ok_or_else(|| {
            Error::ModelOutputError(format!(
                "no output holds {} landmark values",
                NUM_FACE_MESH_LANDMARKS * 3
            ))
        })?;
        Ok((mesh, presence))
    }
}

/// Detector plus mesh: the landmark source used on live frames
pub struct FaceLandmarker {
    detector: FaceDetector,
    mesh: FaceMeshDetector,
    roi_expansion: f32,
}

impl FaceLandmarker {
    /// `roi_expansion` grows the detected box by that share of its size on
    /// each side before squaring it.
    #[must_use]
    pub fn new(detector: FaceDetector, mesh: FaceMeshDetector, roi_expansion: f32) -> Self {
        Self {
            detector,
            mesh,
            roi_expansion,
        }
    }
}

impl LandmarkSource for FaceLandmarker {
    type Frame = Mat;

    fn process(&mut self, frame: &Mat) -> Result<Option<FrameLandmarks>> {
        let size = FrameSize::new(frame.cols(), frame.rows());
        let Some(face) = self.detector.detect(frame)?.into_iter().next() else {
            debug!("No face detected");
            return Ok(None);
        };

        let roi = refine_box(face.bbox, size.width, size.height, self.roi_expansion);
        if roi.width < MIN_FACE_ROI_SIDE {
            debug!("Face box {roi:?} too small for the mesh");
            return Ok(None);
        }

        let crop = Mat::roi(frame, roi)?.try_clone()?;
        match self.mesh.infer(&crop)? {
            Some(landmarks) => crop_to_frame(&landmarks, roi, size).map(Some),
            None => Ok(None),
        }
    }
}

/// Map points normalized to `roi` into points normalized to the whole frame
///
/// `z` keeps its ratio to `x`.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for an empty frame.
#[allow(clippy::cast_precision_loss)]
pub fn crop_to_frame(landmarks: &FrameLandmarks, roi: Rect, frame: FrameSize) -> Result<FrameLandmarks> {
    if frame.width <= 0 || frame.height <= 0 {
        return Err(Error::InvalidInput(format!(
            "cannot map landmarks into a {}x{} frame",
            frame.width, frame.height
        )));
    }
    let (frame_w, frame_h) = (frame.width as f32, frame.height as f32);
    let (x0, y0) = (roi.x as f32, roi.y as f32);
    let (roi_w, roi_h) = (roi.width as f32, roi.height as f32);

    let points = landmarks
        .points()
        .iter()
        .map(|p| {
            Landmark::new(
                (x0 + p.x * roi_w) / frame_w,
                (y0 + p.y * roi_h) / frame_h,
                p.z * roi_w / frame_w,
            )
        })
        .collect();
    Ok(FrameLandmarks::new(points))
}

/// Convert flat `x, y, z` values in model input pixels to normalized points
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn landmarks_from_mesh(mesh: &[f32]) -> FrameLandmarks {
    let scale = FACE_MESH_INPUT_SIZE as f32;
    let points = mesh
        .chunks_exact(3)
        .take(NUM_FACE_MESH_LANDMARKS)
        .map(|c| Landmark::new(c[0] / scale, c[1] / scale, c[2] / scale))
        .collect();
    FrameLandmarks::new(points)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
