//! Camera-backed landmark source with an optional preview window.

use crate::{
    config::Config,
    constants::{ESCAPE_KEY, PREVIEW_WAIT_KEY_MS, PREVIEW_WINDOW_NAME, QUIT_KEY},
    error::{AppError, Result},
    face_detection::FaceDetector,
    mark_detection::{tracked_pair, MarkDetector},
    source::{FrameReport, LandmarkSource, LoopControl, Observation},
    utils::{refine_box, safe_cast::f64_to_i32_clamp},
};
use log::{debug, info};
use opencv::{
    core::{Mat, Point, Point2f, Scalar},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};

/// Smallest face crop, in pixels, passed to the landmark model
const MIN_FACE_CROP: i32 = 16;

/// Video source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Pulls frames from a camera or video file and extracts nose and chin positions
pub struct CameraLandmarkSource {
    capture: VideoCapture,
    from_file: bool,
    face_detector: FaceDetector,
    mark_detector: MarkDetector,
    bbox_expansion: f32,
    flip_x: bool,
    show_window: bool,
    frame: Mat,
    marks: Vec<Point2f>,
}

impl CameraLandmarkSource {
    /// Open the video source and load both models
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened, a model cannot be
    /// loaded or the preview window cannot be created.
    pub fn new(source: &VideoSource, config: &Config) -> Result<Self> {
        let (capture, from_file) = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                // Reduce buffer size for lower latency (webcam only)
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                (cap, false)
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path);
                (VideoCapture::from_file(path, videoio::CAP_ANY)?, true)
            }
        };
        if !capture.is_opened()? {
            return Err(AppError::FrameAcquisition(format!("Could not open video source {source:?}")));
        }

        let face_detector = FaceDetector::new(
            &config.models.face_detector,
            config.face_detection.confidence_threshold,
            config.face_detection.iou_threshold,
        )?;
        let mark_detector = MarkDetector::new(&config.models.face_landmarks)?;

        if config.display.show_window {
            highgui::named_window(PREVIEW_WINDOW_NAME, WINDOW_NORMAL)?;
        }

        Ok(Self {
            capture,
            from_file,
            face_detector,
            mark_detector,
            bbox_expansion: config.face_detection.bbox_expansion,
            flip_x: config.display.flip_x,
            show_window: config.display.show_window,
            frame: Mat::default(),
            marks: Vec::new(),
        })
    }

    fn draw_overlay(&self, canvas: &mut Mat, report: &FrameReport<'_>) -> Result<()> {
        let (width, height) = (canvas.cols(), canvas.rows());
        let to_point = |x: f32, y: f32| {
            Point::new(
                f64_to_i32_clamp(f64::from(x), 0, width - 1),
                f64_to_i32_clamp(f64::from(y), 0, height - 1),
            )
        };

        for mark in &self.marks {
            imgproc::circle(
                canvas,
                to_point(mark.x, mark.y),
                1,
                Scalar::new(0.0, 255.0, 0.0, 0.0),
                -1,
                LINE_8,
                0,
            )?;
        }

        if let Some(pair) = tracked_pair(&self.marks) {
            for landmark in [pair.nose, pair.chin] {
                #[allow(clippy::cast_possible_truncation)]
                let center = to_point(landmark.x as f32, landmark.y as f32);
                imgproc::circle(canvas, center, 4, Scalar::new(0.0, 165.0, 255.0, 0.0), 2, LINE_8, 0)?;
            }
        }

        if let Some(movement) = report.outcome.movement() {
            let text = format!("Nose: {:.1}px  Chin: {:.1}px", movement.nose, movement.chin);
            imgproc::put_text(
                canvas,
                &text,
                Point::new(10, 30),
                FONT_HERSHEY_SIMPLEX,
                0.7,
                Scalar::new(0.0, 255.0, 255.0, 0.0),
                2,
                LINE_8,
                false,
            )?;
        }

        if report.inhibited {
            imgproc::put_text(
                canvas,
                "INHIBITED",
                Point::new(10, 60),
                FONT_HERSHEY_SIMPLEX,
                1.0,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                2,
                LINE_8,
                false,
            )?;
        }

        Ok(())
    }
}

impl LandmarkSource for CameraLandmarkSource {
    fn next_frame(&mut self) -> Result<Observation> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            if self.from_file {
                return Ok(Observation::EndOfStream);
            }
            return Err(AppError::FrameAcquisition("Could not obtain the camera image".to_string()));
        }

        if self.flip_x {
            opencv::core::flip(&frame, &mut self.frame, 1)?;
        } else {
            self.frame = frame;
        }
        self.marks.clear();

        let Some(face) = self.face_detector.detect_primary(&self.frame)? else {
            return Ok(Observation::NoFace);
        };

        let crop = refine_box(face.bbox, self.frame.cols(), self.frame.rows(), self.bbox_expansion);
        if crop.width < MIN_FACE_CROP {
            debug!("Face crop too small: {:?}", crop);
            return Ok(Observation::NoFace);
        }

        self.marks = self.mark_detector.detect_in_frame(&self.frame, crop)?;
        Ok(tracked_pair(&self.marks).map_or(Observation::NoFace, Observation::Face))
    }

    fn present(&mut self, report: &FrameReport<'_>) -> Result<LoopControl> {
        if !self.show_window {
            return Ok(LoopControl::Continue);
        }

        let mut canvas = self.frame.try_clone()?;
        self.draw_overlay(&mut canvas, report)?;
        highgui::imshow(PREVIEW_WINDOW_NAME, &canvas)?;

        let key = highgui::wait_key(PREVIEW_WAIT_KEY_MS)?;
        if key == ESCAPE_KEY || key == QUIT_KEY {
            return Ok(LoopControl::Stop);
        }
        Ok(LoopControl::Continue)
    }
}

impl Drop for CameraLandmarkSource {
    fn drop(&mut self) {
        let _ = self.capture.release();
        if self.show_window {
            let _ = highgui::destroy_all_windows();
        }
    }
}
