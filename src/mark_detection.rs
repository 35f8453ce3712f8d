use crate::{
    constants::{CHIN_LANDMARK, NOSE_TIP_LANDMARK, NUM_FACIAL_LANDMARKS},
    error::Error,
    movement::{Landmark, LandmarkPair},
    utils::safe_cast::usize_to_i32,
    Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Point2f, Rect, Size, Vec3b};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// 68-point facial landmark detector using `ONNX` Runtime
pub struct MarkDetector {
    session: Session,
    input_size: i32,
}

impl MarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX runtime environment cannot be created
    /// - The ONNX model file cannot be loaded
    /// - The model declares no inputs or outputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing MarkDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Detect the 68 landmarks of a face crop, in crop pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Image preprocessing fails
    /// - The ONNX model inference fails
    /// - The output holds fewer than 68 points
    pub fn detect(&self, face_image: &Mat) -> Result<Vec<Point2f>> {
        let input = self.preprocess(face_image)?;
        let marks = self.forward(input)?;
        self.postprocess(&marks, face_image.cols(), face_image.rows())
    }

    /// Detect landmarks inside `face_box` of `frame` and return them in frame coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the box lies outside the frame or detection fails.
    pub fn detect_in_frame(&self, frame: &Mat, face_box: Rect) -> Result<Vec<Point2f>> {
        let roi = Mat::roi(frame, face_box)?;
        let crop = roi.try_clone()?;
        #[allow(clippy::cast_precision_loss)]
        let (dx, dy) = (face_box.x as f32, face_box.y as f32);

        Ok(self
            .detect(&crop)?
            .into_iter()
            .map(|p| Point2f::new(p.x + dx, p.y + dy))
            .collect())
    }

    /// Resize to the model input and convert BGR u8 to RGB f32 in [0, 1], NHWC
    #[allow(clippy::cast_sign_loss)] // Input size is a positive constant
    fn preprocess(&self, image: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let size = self.input_size as usize;
        let mut array = Array4::<f32>::zeros((1, size, size, 3));
        for row in 0..size {
            for col in 0..size {
                let pixel = resized.at_2d::<Vec3b>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    array[[0, row, col, ch]] = f32::from(pixel[2 - ch]) / 255.0;
                }
            }
        }

        Ok(array)
    }

    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let marks_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();
        let marks = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get output data".to_string()))?;

        Ok(marks.to_vec())
    }

    /// Scale model-space points (relative to the input size) to the crop size
    #[allow(clippy::cast_precision_loss)]
    fn postprocess(&self, marks: &[f32], crop_width: i32, crop_height: i32) -> Result<Vec<Point2f>> {
        if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
            return Err(Error::ModelDataFormatError(format!(
                "Expected {} landmark values, got {}",
                NUM_FACIAL_LANDMARKS * 2,
                marks.len()
            )));
        }

        let sx = crop_width as f32 / self.input_size as f32;
        let sy = crop_height as f32 / self.input_size as f32;
        Ok(marks
            .chunks_exact(2)
            .take(NUM_FACIAL_LANDMARKS)
            .map(|xy| Point2f::new(xy[0] * sx, xy[1] * sy))
            .collect())
    }
}

/// Pick the nose tip and chin out of a full 68-point set
#[must_use]
pub fn tracked_pair(marks: &[Point2f]) -> Option<LandmarkPair> {
    let nose = marks.get(NOSE_TIP_LANDMARK)?;
    let chin = marks.get(CHIN_LANDMARK)?;
    Some(LandmarkPair::new(
        Landmark::new(f64::from(nose.x), f64::from(nose.y)),
        Landmark::new(f64::from(chin.x), f64::from(chin.y)),
    ))
}
