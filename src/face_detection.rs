//! Face box detection with an SCRFD model.
//!
//! The face mesh model only produces usable points on a tight face crop, so
//! every frame first goes through this detector. Boxes are returned in frame
//! pixels, strongest first, after non-maximum suppression.

use crate::{error::Error, utils::safe_cast::f32_to_i32_clamp, Result};
use log::{debug, info, warn};
use ndarray::{Array4, CowArray};
use opencv::{
    core::{Mat, Rect, Scalar, Size, Vec3f, CV_32F, CV_8UC3},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Input edge used when the model leaves its spatial dimensions dynamic
const DEFAULT_INPUT_SIZE: i32 = 640;

/// Corner coordinates `[x1, y1, x2, y2]` in model input pixels
type BoxCorners = [f32; 4];

/// A detected face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Bounding box in frame pixels, clipped to the frame
    pub bbox: Rect,
    /// Detection confidence
    pub score: f32,
}

/// Stride pyramid of an SCRFD export, derived from its output count
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputLayout {
    strides: Vec<usize>,
    anchors_per_cell: usize,
}

impl OutputLayout {
    fn from_output_count(count: usize) -> Self {
        match count {
            6 | 9 => Self {
                strides: vec![8, 16, 32],
                anchors_per_cell: 2,
            },
            10 | 15 => Self {
                strides: vec![8, 16, 32, 64, 128],
                anchors_per_cell: 1,
            },
            _ => {
                warn!("Unknown face detector layout with {count} outputs, assuming 3 strides");
                Self {
                    strides: vec![8, 16, 32],
                    anchors_per_cell: 2,
                }
            }
        }
    }
}

/// SCRFD face detector using `ONNX` Runtime
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    score_threshold: f32,
    nms_threshold: f32,
    layout: OutputLayout,
    center_cache: HashMap<(usize, usize, usize), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Load the model and prepare an inference session
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs.
    pub fn new<P: AsRef<Path>>(model_path: P, score_threshold: f32, nms_threshold: f32) -> Result<Self> {
        info!(
            "Initializing FaceDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Model has no inputs".to_string()))?;

        // NCHW; dynamic or missing dimensions fall back to the usual 640
        let dim = |index: usize| {
            input
                .dimensions
                .get(index)
                .copied()
                .flatten()
                .and_then(|d| i32::try_from(d).ok())
                .filter(|d| *d > 0)
                .unwrap_or(DEFAULT_INPUT_SIZE)
        };
        let input_size = (dim(3), dim(2));
        let layout = OutputLayout::from_output_count(session.outputs.len());
        debug!("Face detector input {}x{}, layout {:?}", input_size.0, input_size.1, layout);

        Ok(Self {
            session,
            input_size,
            score_threshold,
            nms_threshold,
            layout,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces in a BGR frame, strongest first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing, inference or output decoding fails.
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        let (width, height) = (image.cols(), image.rows());
        if width <= 0 || height <= 0 {
            return Ok(Vec::new());
        }

        let (blob, scale) = self.letterbox(image)?;
        let input = Self::preprocess(&blob)?;
        let candidates = self.forward(input)?;

        Ok(non_max_suppression(candidates, self.nms_threshold)
            .into_iter()
            .map(|(corners, score)| FaceDetection {
                bbox: corners_to_rect(corners, scale, width, height),
                score,
            })
            .collect())
    }

    /// Resize keeping the aspect ratio and pad bottom/right to the input size
    #[allow(clippy::cast_precision_loss)]
    fn letterbox(&self, image: &Mat) -> Result<(Mat, f32)> {
        let (input_width, input_height) = self.input_size;
        let (width, height) = (image.cols() as f32, image.rows() as f32);
        let fit = (input_width as f32 / width).min(input_height as f32 / height);
        let new_width = f32_to_i32_clamp(width * fit, 1, input_width);
        let new_height = f32_to_i32_clamp(height * fit, 1, input_height);

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut padded =
            Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        Ok((padded, new_height as f32 / height))
    }

    /// Convert to RGB, normalize to `(p - 127.5) / 128` and lay out as NCHW
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let mut rgb_image = Mat::default();
        imgproc::cvt_color(image, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 128.0, -127.5 / 128.0)?;

        let rows = usize::try_from(float_image.rows())
            .map_err(|_| Error::InvalidInput("negative image height".to_string()))?;
        let cols = usize::try_from(float_image.cols())
            .map_err(|_| Error::InvalidInput("negative image width".to_string()))?;

        let pixels = float_image.data_typed::<Vec3f>()?;
        let data: Vec<f32> = pixels.iter().flat_map(|px| [px[0], px[1], px[2]]).collect();

        let nhwc = Array4::from_shape_vec((1, rows, cols, 3), data)
            .map_err(|e| Error::ModelError(format!("Failed to create input array: {e}")))?;
        Ok(nhwc.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned())
    }

    /// Run the model and decode every anchor above the score threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&mut self, input: Array4<f32>) -> Result<Vec<(BoxCorners, f32)>> {
        let (input_height, input_width) = (input.shape()[2], input.shape()[3]);
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let offset = self.layout.strides.len();
        let mut candidates = Vec::new();
        for (idx, &stride) in self.layout.strides.iter().enumerate() {
            let scores = output_values(&outputs, idx)?;
            let distances = output_values(&outputs, idx + offset)?;

            let (cells_w, cells_h) = (input_width / stride, input_height / stride);
            let per_cell = self.layout.anchors_per_cell;
            let centers = self
                .center_cache
                .entry((cells_h, cells_w, stride))
                .or_insert_with(|| anchor_centers(cells_w, cells_h, stride, per_cell));

            if scores.len() != centers.len() || distances.len() != centers.len() * 4 {
                return Err(Error::ModelOutputError(format!(
                    "stride {stride}: expected {} anchors, got {} scores and {} box values",
                    centers.len(),
                    scores.len(),
                    distances.len()
                )));
            }

            let scale = stride as f32;
            for ((center, &score), d) in centers.iter().zip(&scores).zip(distances.chunks_exact(4)) {
                if score >= self.score_threshold {
                    let corners =
                        distance_to_bbox(*center, [d[0] * scale, d[1] * scale, d[2] * scale, d[3] * scale]);
                    candidates.push((corners, score));
                }
            }
        }

        Ok(candidates)
    }
}

fn output_values(outputs: &[Value<'_>], index: usize) -> Result<Vec<f32>> {
    let output = outputs
        .get(index)
        .ok_or_else(|| Error::ModelOutputError(format!("face detector output {index} missing")))?;
    let tensor = output.try_extract::<f32>()?;
    let view = tensor.view();
    Ok(view.iter().copied().collect())
}

/// Anchor centers of one stride level, row-major, each repeated per anchor
#[allow(clippy::cast_precision_loss)]
fn anchor_centers(cells_w: usize, cells_h: usize, stride: usize, per_cell: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity(cells_w * cells_h * per_cell);
    for y in 0..cells_h {
        for x in 0..cells_w {
            let center = ((x * stride) as f32, (y * stride) as f32);
            centers.extend(std::iter::repeat(center).take(per_cell));
        }
    }
    centers
}

/// Left, top, right, bottom distances from an anchor center to box corners
fn distance_to_bbox(center: (f32, f32), distance: [f32; 4]) -> BoxCorners {
    [
        center.0 - distance[0],
        center.1 - distance[1],
        center.0 + distance[2],
        center.1 + distance[3],
    ]
}

fn iou(a: &BoxCorners, b: &BoxCorners) -> f32 {
    let area = |r: &BoxCorners| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = w * h;
    let union = area(a) + area(b) - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Greedy suppression keeping the strongest of every overlapping group
fn non_max_suppression(mut candidates: Vec<(BoxCorners, f32)>, threshold: f32) -> Vec<(BoxCorners, f32)> {
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut kept: Vec<(BoxCorners, f32)> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(&k.0, &candidate.0) <= threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Undo the letterbox scale and clip to the frame
fn corners_to_rect(corners: BoxCorners, scale: f32, width: i32, height: i32) -> Rect {
    let x1 = f32_to_i32_clamp(corners[0] / scale, 0, width);
    let y1 = f32_to_i32_clamp(corners[1] / scale, 0, height);
    let x2 = f32_to_i32_clamp(corners[2] / scale, 0, width);
    let y2 = f32_to_i32_clamp(corners[3] / scale, 0, height);
    Rect::new(x1, y1, (x2 - x1).max(0), (y2 - y1).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_output_count() {
        assert_eq!(OutputLayout::from_output_count(9).strides, vec![8, 16, 32]);
        assert_eq!(OutputLayout::from_output_count(9).anchors_per_cell, 2);
        assert_eq!(OutputLayout::from_output_count(10).strides.len(), 5);
        assert_eq!(OutputLayout::from_output_count(15).anchors_per_cell, 1);
        assert_eq!(OutputLayout::from_output_count(4).strides.len(), 3);
    }

    #[test]
    fn test_anchor_centers() {
        let centers = anchor_centers(2, 2, 8, 2);
        assert_eq!(centers.len(), 8);
        assert_eq!(centers[0], (0.0, 0.0));
        assert_eq!(centers[1], (0.0, 0.0));
        assert_eq!(centers[2], (8.0, 0.0));
        assert_eq!(centers[4], (0.0, 8.0));
    }

    #[test]
    fn test_distance_to_bbox() {
        assert_eq!(
            distance_to_bbox((100.0, 100.0), [10.0, 10.0, 20.0, 20.0]),
            [90.0, 90.0, 120.0, 120.0]
        );
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(iou(&[0.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_nms_keeps_strongest_of_overlap() {
        let kept = non_max_suppression(
            vec![
                ([0.0, 0.0, 10.0, 10.0], 0.6),
                ([1.0, 1.0, 11.0, 11.0], 0.9),
                ([50.0, 50.0, 60.0, 60.0], 0.7),
            ],
            0.4,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].1, 0.9);
        assert_eq!(kept[1].1, 0.7);
    }

    #[test]
    fn test_corners_to_rect_rescales_and_clips() {
        let rect = corners_to_rect([-10.0, 20.0, 100.0, 400.0], 0.5, 640, 480);
        assert_eq!(rect, Rect::new(0, 40, 200, 440));
        let outside = corners_to_rect([2000.0, 2000.0, 2100.0, 2100.0], 1.0, 640, 480);
        assert_eq!((outside.width, outside.height), (0, 0));
    }

    #[test]
    #[ignore = "Requires ONNX models"]
    fn test_detect_on_blank_frame() {
        let mut detector = FaceDetector::new("assets/face_detector.onnx", 0.5, 0.4).unwrap();
        let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(detector.detect(&frame).unwrap().is_empty());
    }
}
