//! Head movement feedback library: camera-based head tracking that answers
//! sudden head movements with a short burst of band-limited noise.
//!
//! This library provides:
//! - ONNX Runtime face and 68-point landmark detection
//! - `OpenCV` capture and preview
//! - A movement decision policy with a single-slot, last-writer-wins
//!   stimulus scheduler
//! - Band-limited white noise synthesis and stereo playback through `cpal`
//!
//! The per-frame pipeline consists of:
//! 1. Face detection to locate the primary face
//! 2. Landmark detection to find the nose tip and chin
//! 3. Euclidean displacement of both points since the previous tracked frame
//! 4. A deferred stimulus when either displacement reaches the threshold and
//!    no stimulus is currently playing
//!
//! # Examples
//!
//! ## Driving the decision policy
//!
//! ```no_run
//! use head_movement_feedback::{
//!     config::StimulusConfig,
//!     detection::{DetectionSession, FrameOutcome},
//!     movement::{Landmark, LandmarkPair},
//!     stimulus::playback::AudioEmitter,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StimulusConfig::default();
//! let emitter = AudioEmitter::open_default()?;
//! let mut session = DetectionSession::new(&config, Arc::new(emitter));
//!
//! let still = LandmarkPair::new(Landmark::new(320.0, 240.0), Landmark::new(320.0, 330.0));
//! let moved = LandmarkPair::new(Landmark::new(350.0, 240.0), Landmark::new(350.0, 330.0));
//!
//! assert_eq!(session.observe(Some(still))?, FrameOutcome::Primed);
//! if let FrameOutcome::Triggered(movement) = session.observe(Some(moved))? {
//!     println!("Moved {:.1}px, stimulus scheduled", movement.peak());
//! }
//!
//! session.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Synthesizing a stimulus
//!
//! ```no_run
//! use head_movement_feedback::stimulus::{noise, StimulusParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = StimulusParams {
//!     sample_rate: 44_100,
//!     duration_secs: 0.2,
//!     freq_min_hz: 9000,
//!     freq_max_hz: 12000,
//!     left_enabled: false,
//!     right_enabled: true,
//! };
//!
//! let buffer = noise::generate(&params)?;
//! println!("{} frames, {:?}", buffer.frames(), buffer.duration());
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete Pipeline Example
//!
//! ```no_run
//! use head_movement_feedback::{
//!     app::{AppConfig, FeedbackApp},
//!     camera::VideoSource,
//!     config::Config,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = FeedbackApp::new(AppConfig {
//!     video_source: VideoSource::Camera(0),
//!     config: Config::default(),
//! })?;
//!
//! let summary = app.run()?;
//! println!("{} triggers over {} frames", summary.triggers, summary.frames);
//! # Ok(())
//! # }
//! ```

/// Face detection module for finding faces in images
pub mod face_detection;

/// Facial landmark detection module for finding 68 key points
pub mod mark_detection;

/// Landmark positions and frame-to-frame displacement
pub mod movement;

/// Shared flag that suppresses triggers while a stimulus plays
pub mod gate;

/// Single-slot deferred stimulus scheduler
pub mod scheduler;

/// Stimulus parameters, noise synthesis and audio playback
pub mod stimulus;

/// Landmark source interface consumed by the detection loop
pub mod source;

/// Movement decision policy and detection loop
pub mod detection;

/// Camera-backed landmark source and preview window
pub mod camera;

/// Utility functions for image processing and coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Command line interface
pub mod cli;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
