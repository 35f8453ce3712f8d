//! Main application module: wires the camera, the detection session and the
//! audio emitter together.

use crate::{
    camera::{CameraLandmarkSource, VideoSource},
    config::Config,
    detection::{DetectionLoop, DetectionSession, LoopSummary},
    error::Result,
    stimulus::playback::AudioEmitter,
};
use log::info;
use std::sync::Arc;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// Validated configuration
    pub config: Config,
}

/// Head movement feedback application
pub struct FeedbackApp {
    detection: DetectionLoop<CameraLandmarkSource>,
}

impl FeedbackApp {
    /// Open every device and build the detection loop.
    ///
    /// The configuration is validated first so bad parameters fail before any
    /// device is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a model file is
    /// missing, or the camera, models or audio output cannot be initialised.
    pub fn new(app_config: AppConfig) -> Result<Self> {
        info!("Initializing Head Movement Feedback application");
        let AppConfig { video_source, config } = app_config;

        config.validate()?;
        config.check_model_files()?;

        let stimulus = &config.stimulus;
        info!(
            "Threshold {}px, delay {}s, stimulus {}s at {}-{} Hz (left: {}, right: {})",
            stimulus.threshold_movement,
            stimulus.interval_secs,
            stimulus.duration_secs,
            stimulus.freq_min_hz,
            stimulus.freq_max_hz,
            stimulus.left_ear,
            stimulus.right_ear
        );

        let emitter = AudioEmitter::open_default()?;
        let source = CameraLandmarkSource::new(&video_source, &config)?;
        let session = DetectionSession::new(stimulus, Arc::new(emitter));

        Ok(Self {
            detection: DetectionLoop::new(source, session),
        })
    }

    /// Run the detection loop until the user quits or the input ends
    ///
    /// # Errors
    ///
    /// Propagates errors from the detection loop.
    pub fn run(&mut self) -> Result<LoopSummary> {
        let summary = self.detection.run()?;
        let stats = self.detection.session().scheduler().stats();
        info!(
            "Stimuli: {} scheduled, {} superseded, {} played, {} failed",
            stats.scheduled, stats.superseded, stats.emitted, stats.failed
        );
        Ok(summary)
    }
}
