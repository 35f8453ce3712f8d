//! SCRFD face detection with ONNX Runtime.
//!
//! Only the best-scoring face is of interest to the feedback loop, but the
//! detector still runs non-maximum suppression so callers can inspect every
//! candidate.

use crate::{
    constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    error::Error,
    utils::safe_cast::{f32_to_i32_clamp, i32_to_usize, usize_to_i32},
    Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, Vec3b, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input edge length
const DEFAULT_DETECTOR_INPUT_SIZE: i32 = 640;

/// Face detection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face in frame pixels
    pub bbox: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// Anchor layout implied by the number of model outputs
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnchorLayout {
    strides: Vec<i32>,
    anchors_per_cell: usize,
    /// Distance between a stride's score output and its bbox output
    bbox_offset: usize,
}

impl AnchorLayout {
    fn for_outputs(num_outputs: usize) -> Self {
        match num_outputs {
            6 | 9 => Self {
                strides: vec![8, 16, 32],
                anchors_per_cell: 2,
                bbox_offset: 3,
            },
            10 | 15 => Self {
                strides: vec![8, 16, 32, 64, 128],
                anchors_per_cell: 1,
                bbox_offset: 5,
            },
            _ => {
                log::warn!("Unknown model configuration with {} outputs, using defaults", num_outputs);
                Self::for_outputs(6)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0).max(0.0) * (self.y2 - self.y1 + 1.0).max(0.0)
    }

    fn iou(&self, other: &Self) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// SCRFD Face Detector using ONNX Runtime
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    layout: AnchorLayout,
    center_cache: HashMap<(i32, i32, i32), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime environment cannot be created or the
    /// model cannot be loaded.
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!("Initializing FaceDetector with model: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?;

        // Shape is [batch, channels, height, width]; dynamic axes fall back to the default
        let dims = &input_meta.dimensions;
        let input_size = if dims.len() >= 4 {
            let height = dims[2].map_or(DEFAULT_DETECTOR_INPUT_SIZE, |d| d as i32);
            let width = dims[3].map_or(DEFAULT_DETECTOR_INPUT_SIZE, |d| d as i32);
            (width, height)
        } else {
            (DEFAULT_DETECTOR_INPUT_SIZE, DEFAULT_DETECTOR_INPUT_SIZE)
        };

        let layout = AnchorLayout::for_outputs(session.outputs.len());

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            layout,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces, highest score first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails or the model
    /// output has an unexpected shape.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        let (input_width, input_height) = self.input_size;
        let img_height = image.rows();
        let img_width = image.cols();
        if img_width <= 0 || img_height <= 0 {
            return Err(Error::InvalidInput(format!("Empty image {img_width}x{img_height}")));
        }

        // Letterbox: keep aspect ratio, pad right/bottom
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut det_img = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = det_img.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let inputs = Self::preprocess(&det_img)?;
        let candidates = self.forward(inputs, det_scale)?;
        let kept = self.nms(candidates);

        Ok(kept
            .into_iter()
            .map(|c| FaceDetection {
                bbox: Rect::new(
                    f32_to_i32_clamp(c.x1, i32::MIN, i32::MAX),
                    f32_to_i32_clamp(c.y1, i32::MIN, i32::MAX),
                    f32_to_i32_clamp(c.x2 - c.x1, 0, i32::MAX),
                    f32_to_i32_clamp(c.y2 - c.y1, 0, i32::MAX),
                ),
                score: c.score,
            })
            .collect())
    }

    /// Detect the single most confident face
    ///
    /// # Errors
    ///
    /// See [`FaceDetector::detect`].
    pub fn detect_primary(&mut self, image: &Mat) -> Result<Option<FaceDetection>> {
        Ok(self.detect(image)?.into_iter().next())
    }

    /// BGR u8 image to normalised RGB NCHW tensor
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let height = i32_to_usize(image.rows())?;
        let width = i32_to_usize(image.cols())?;
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        for row in 0..height {
            for col in 0..width {
                let pixel = image.at_2d::<Vec3b>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    // BGR -> RGB
                    let value = f32::from(pixel[2 - ch]);
                    array[[0, ch, row, col]] = (value - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
                }
            }
        }

        Ok(array)
    }

    /// Run inference and decode every anchor above the confidence threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&mut self, inputs: Array4<f32>, det_scale: f32) -> Result<Vec<Candidate>> {
        let input_height = usize_to_i32(inputs.shape()[2])?;
        let input_width = usize_to_i32(inputs.shape()[3])?;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let strides = self.layout.strides.clone();
        if outputs.len() < strides.len() + self.layout.bbox_offset {
            return Err(Error::ModelOutputError(format!(
                "Expected at least {} outputs, got {}",
                strides.len() + self.layout.bbox_offset,
                outputs.len()
            )));
        }

        let mut candidates = Vec::new();
        for (idx, &stride) in strides.iter().enumerate() {
            let scores_output = outputs[idx].try_extract::<f32>()?;
            let scores_view = scores_output.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score tensor".to_string()))?;

            let bbox_output = outputs[idx + self.layout.bbox_offset].try_extract::<f32>()?;
            let bbox_view = bbox_output.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox tensor".to_string()))?;

            let centers = self.anchor_centers(input_height / stride, input_width / stride, stride);
            if distances.len() < scores.len() * 4 || centers.len() < scores.len() {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {stride}: {} scores, {} bbox values, {} anchors",
                    scores.len(),
                    distances.len(),
                    centers.len()
                )));
            }

            let stride = stride as f32;
            for (i, &score) in scores.iter().enumerate() {
                if score < self.conf_threshold {
                    continue;
                }
                let (cx, cy) = centers[i];
                let d = &distances[i * 4..i * 4 + 4];
                candidates.push(Candidate {
                    score,
                    x1: (cx - d[0] * stride) / det_scale,
                    y1: (cy - d[1] * stride) / det_scale,
                    x2: (cx + d[2] * stride) / det_scale,
                    y2: (cy + d[3] * stride) / det_scale,
                });
            }
        }

        Ok(candidates)
    }

    /// Anchor centers for a feature map, cached per (height, width, stride)
    #[allow(clippy::cast_precision_loss)]
    fn anchor_centers(&mut self, height: i32, width: i32, stride: i32) -> Vec<(f32, f32)> {
        let anchors_per_cell = self.layout.anchors_per_cell;
        self.center_cache
            .entry((height, width, stride))
            .or_insert_with(|| {
                let mut centers = Vec::new();
                for y in 0..height {
                    for x in 0..width {
                        let center = ((x * stride) as f32, (y * stride) as f32);
                        centers.extend(std::iter::repeat(center).take(anchors_per_cell));
                    }
                }
                centers
            })
            .clone()
    }

    /// Greedy non-maximum suppression, highest score first
    fn nms(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut kept: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if kept.iter().all(|k| k.iou(&candidate) <= self.nms_threshold) {
                kept.push(candidate);
            }
        }
        kept
    }
}
