//! Auditory stimulus parameters, synthesis and playback.
//!
//! The detection core only sees the [`StimulusEmitter`] trait. A stimulus is a
//! burst of band-limited white noise routed to the left and/or right ear.

/// Band-limited white noise synthesis
pub mod noise;

/// Audio device playback through `cpal`
pub mod playback;

use crate::Result;
use std::time::Duration;

/// Timing, band and routing of one stimulus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusParams {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Playback duration in seconds
    pub duration_secs: f64,
    /// Lower edge of the noise band in Hz
    pub freq_min_hz: u32,
    /// Upper edge of the noise band in Hz
    pub freq_max_hz: u32,
    /// Play on the left channel
    pub left_enabled: bool,
    /// Play on the right channel
    pub right_enabled: bool,
}

impl StimulusParams {
    /// Playback duration, zero if the configured value is not representable
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_secs).unwrap_or(Duration::ZERO)
    }

    /// Number of samples per channel
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_count(&self) -> usize {
        if self.duration_secs.is_finite() && self.duration_secs > 0.0 {
            (self.duration_secs * f64::from(self.sample_rate)) as usize
        } else {
            0
        }
    }
}

/// Synthesizes and plays a stimulus.
///
/// `emit` blocks until playback has completed. It is always invoked from a
/// stimulus worker thread, never from the detection loop.
pub trait StimulusEmitter: Send + Sync {
    /// Play one stimulus to completion
    fn emit(&self, params: &StimulusParams) -> Result<()>;

    /// Emitter name for logging
    fn name(&self) -> &str;
}
