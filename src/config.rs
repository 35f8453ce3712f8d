//! Configuration management for the head movement feedback application

use crate::{
    constants::{
        DEFAULT_BBOX_EXPANSION, DEFAULT_FACE_CONFIDENCE, DEFAULT_FACE_NMS_THRESHOLD, DEFAULT_FREQUENCY_MAX_HZ,
        DEFAULT_FREQUENCY_MIN_HZ, DEFAULT_INTERVAL_SECS, DEFAULT_SAMPLE_RATE, DEFAULT_SOUND_TIME_SECS,
        DEFAULT_THRESHOLD_MOVEMENT, MAX_SOUND_TIME_SECS,
    },
    stimulus::StimulusParams,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Movement threshold and stimulus parameters
    pub stimulus: StimulusConfig,

    /// Model configuration
    pub models: ModelConfig,

    /// Face detection configuration
    pub face_detection: FaceDetectionConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Movement threshold, trigger delay and stimulus shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Pixel distance between frames that counts as a head movement
    pub threshold_movement: f64,

    /// Delay between an accepted trigger and the stimulus, in seconds
    pub interval_secs: f64,

    /// Stimulus duration in seconds
    pub duration_secs: f64,

    /// Lower edge of the noise band in Hz
    pub freq_min_hz: u32,

    /// Upper edge of the noise band in Hz
    pub freq_max_hz: u32,

    /// Play the stimulus in the left ear
    pub left_ear: bool,

    /// Play the stimulus in the right ear
    pub right_ear: bool,

    /// Output sample rate in Hz
    pub sample_rate: u32,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to facial landmarks ONNX model
    pub face_landmarks: PathBuf,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,

    /// Face region expansion factor before landmark detection
    pub bbox_expansion: f32,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the preview window
    pub show_window: bool,

    /// Mirror the camera image horizontally
    pub flip_x: bool,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            threshold_movement: DEFAULT_THRESHOLD_MOVEMENT,
            interval_secs: DEFAULT_INTERVAL_SECS,
            duration_secs: DEFAULT_SOUND_TIME_SECS,
            freq_min_hz: DEFAULT_FREQUENCY_MIN_HZ,
            freq_max_hz: DEFAULT_FREQUENCY_MAX_HZ,
            left_ear: false,
            right_ear: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_FACE_CONFIDENCE,
            iou_threshold: DEFAULT_FACE_NMS_THRESHOLD,
            bbox_expansion: DEFAULT_BBOX_EXPANSION,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_window: true,
            flip_x: false,
        }
    }
}

impl StimulusConfig {
    /// Parameters handed to the stimulus emitter
    #[must_use]
    pub const fn params(&self) -> StimulusParams {
        StimulusParams {
            sample_rate: self.sample_rate,
            duration_secs: self.duration_secs,
            freq_min_hz: self.freq_min_hz,
            freq_max_hz: self.freq_max_hz,
            left_enabled: self.left_ear,
            right_enabled: self.right_ear,
        }
    }

    /// Trigger delay, zero if the configured value is not representable
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs).unwrap_or(Duration::ZERO)
    }

    /// Validate the stimulus parameters
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_movement.is_finite() || self.threshold_movement < 0.0 {
            return Err(Error::ConfigError(format!(
                "Movement threshold must be a non-negative number, got {}",
                self.threshold_movement
            )));
        }
        if !self.interval_secs.is_finite() || self.interval_secs < 0.0 {
            return Err(Error::ConfigError(format!(
                "Interval must be a non-negative number of seconds, got {}",
                self.interval_secs
            )));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(Error::ConfigError(format!(
                "Stimulus duration must be greater than 0, got {}",
                self.duration_secs
            )));
        }
        if self.duration_secs > MAX_SOUND_TIME_SECS {
            return Err(Error::ConfigError(format!(
                "Stimulus duration must be at most {MAX_SOUND_TIME_SECS}s, got {}",
                self.duration_secs
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::ConfigError("Sample rate must be greater than 0".to_string()));
        }
        if self.params().sample_count() == 0 {
            return Err(Error::ConfigError(format!(
                "Stimulus duration {}s is shorter than one sample at {} Hz",
                self.duration_secs, self.sample_rate
            )));
        }
        if self.freq_min_hz == 0 {
            return Err(Error::ConfigError("Minimum frequency must be greater than 0".to_string()));
        }
        if self.freq_min_hz > self.freq_max_hz {
            return Err(Error::ConfigError(format!(
                "Minimum frequency {} Hz exceeds maximum frequency {} Hz",
                self.freq_min_hz, self.freq_max_hz
            )));
        }
        if self.freq_max_hz > self.sample_rate / 2 {
            return Err(Error::ConfigError(format!(
                "Maximum frequency {} Hz exceeds the Nyquist limit of {} Hz",
                self.freq_max_hz,
                self.sample_rate / 2
            )));
        }
        Ok(())
    }

    /// Ask for each parameter in turn, keeping the current value on an empty answer.
    ///
    /// Questions are asked in the order threshold, interval, duration, minimum
    /// frequency, maximum frequency, right ear, left ear. An ear is enabled iff
    /// the answer is `true` (case-insensitive). End of input counts as an
    /// empty answer.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a non-numeric answer and an `Io` error if
    /// reading or writing fails.
    pub fn prompt<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<()> {
        let mut prompter = Prompter { input, output };

        if let Some(v) = prompter.number("Movement threshold in pixels", self.threshold_movement)? {
            self.threshold_movement = v;
        }
        if let Some(v) = prompter.number("Delay before the stimulus in seconds", self.interval_secs)? {
            self.interval_secs = v;
        }
        if let Some(v) = prompter.number("Stimulus duration in seconds", self.duration_secs)? {
            self.duration_secs = v;
        }
        if let Some(v) = prompter.number("Minimum frequency in Hz", self.freq_min_hz)? {
            self.freq_min_hz = v;
        }
        if let Some(v) = prompter.number("Maximum frequency in Hz", self.freq_max_hz)? {
            self.freq_max_hz = v;
        }
        if let Some(v) = prompter.flag("Play the stimulus in the right ear? (true/false)", self.right_ear)? {
            self.right_ear = v;
        }
        if let Some(v) = prompter.flag("Play the stimulus in the left ear? (true/false)", self.left_ear)? {
            self.left_ear = v;
        }

        Ok(())
    }
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn ask(&mut self, question: &str, current: &str) -> Result<Option<String>> {
        write!(self.output, "{question} (default: {current}): ")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim();
        Ok(if answer.is_empty() { None } else { Some(answer.to_string()) })
    }

    fn number<T>(&mut self, question: &str, current: T) -> Result<Option<T>>
    where
        T: FromStr + std::fmt::Display,
    {
        match self.ask(question, &current.to_string())? {
            None => Ok(None),
            Some(answer) => answer
                .parse()
                .map(Some)
                .map_err(|_| Error::ConfigError(format!("{question}: '{answer}' is not a valid number"))),
        }
    }

    fn flag(&mut self, question: &str, current: bool) -> Result<Option<bool>> {
        Ok(self
            .ask(question, &current.to_string())?
            .map(|answer| answer.eq_ignore_ascii_case("true")))
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

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration values. Model files are checked separately.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.stimulus.validate()?;

        if !(0.0..=1.0).contains(&self.face_detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face_detection.iou_threshold) {
            return Err(Error::ConfigError(
                "IOU threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face_detection.bbox_expansion) {
            return Err(Error::ConfigError(
                "Bounding box expansion must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that the configured model files exist
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the missing file.
    pub fn check_model_files(&self) -> Result<()> {
        if !self.models.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.models.face_detector.display()
            )));
        }
        if !self.models.face_landmarks.exists() {
            return Err(Error::ConfigError(format!(
                "Face landmarks model not found: {}",
                self.models.face_landmarks.display()
            )));
        }
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Movement Feedback Configuration

# Movement detection and stimulus
stimulus:
  threshold_movement: 12.0
  interval_secs: 0.0
  duration_secs: 0.2
  freq_min_hz: 9000
  freq_max_hz: 12000
  left_ear: false
  right_ear: true
  sample_rate: 44100

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"

# Face detection parameters
face_detection:
  confidence_threshold: 0.5
  iou_threshold: 0.4
  bbox_expansion: 0.2

# Display settings
display:
  show_window: true
  flip_x: false
"#;
