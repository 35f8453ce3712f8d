//! Constants used throughout the application

/// Number of facial landmarks for full face
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Nose tip in the iBUG 68-point scheme
pub const NOSE_TIP_LANDMARK: usize = 30;

/// Chin (menton) in the iBUG 68-point scheme
pub const CHIN_LANDMARK: usize = 8;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default face detection parameters
pub const DEFAULT_FACE_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_FACE_NMS_THRESHOLD: f32 = 0.4;
pub const DEFAULT_BBOX_EXPANSION: f32 = 0.2;

/// Movement threshold in pixels between consecutive frames
pub const DEFAULT_THRESHOLD_MOVEMENT: f64 = 12.0;

/// Delay between an accepted trigger and the stimulus, in seconds.
/// Zero because the camera pipeline already lags.
pub const DEFAULT_INTERVAL_SECS: f64 = 0.0;

/// Stimulus duration in seconds
pub const DEFAULT_SOUND_TIME_SECS: f64 = 0.2;

/// Longest accepted stimulus, in seconds
pub const MAX_SOUND_TIME_SECS: f64 = 10.0;

/// Default noise band
pub const DEFAULT_FREQUENCY_MIN_HZ: u32 = 9000;
pub const DEFAULT_FREQUENCY_MAX_HZ: u32 = 12000;

/// Output sample rate for synthesized stimuli
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Key codes that end the preview loop
pub const ESCAPE_KEY: i32 = 27;
pub const QUIT_KEY: i32 = b'q' as i32;

/// Preview window poll interval in milliseconds
pub const PREVIEW_WAIT_KEY_MS: i32 = 5;

/// Preview window title
pub const PREVIEW_WINDOW_NAME: &str = "Head Movement Detection";

/// Extra time allowed for the output stream to report completion, in milliseconds
pub const PLAYBACK_GRACE_MS: u64 = 500;

/// Time given to the device to play out its last buffer, in milliseconds
pub const PLAYBACK_DRAIN_MS: u64 = 30;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
