//! Band-limited white noise.
//!
//! Gaussian noise is transformed with a complex FFT, every bin outside the
//! requested band is zeroed (mirrored bins included, so the inverse stays
//! real), and the inverse transform is peak-normalised to ±1.

use super::StimulusParams;
use crate::{constants::EPSILON, Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rustfft::{num_complex::Complex, FftPlanner};
use std::time::Duration;

/// Two-channel sample buffer
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    /// Left channel samples
    pub left: Vec<f32>,
    /// Right channel samples
    pub right: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl StereoBuffer {
    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Samples interleaved as L, R, L, R, ...
    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }
}

/// Generate a stimulus buffer using the thread-local RNG
///
/// # Errors
///
/// See [`band_limited_noise`].
pub fn generate(params: &StimulusParams) -> Result<StereoBuffer> {
    band_limited_noise(params, &mut rand::thread_rng())
}

/// Generate band-limited noise and route it to the enabled channels.
///
/// A disabled channel is all zeros.
///
/// # Errors
///
/// Returns an error if the stimulus is shorter than one sample or the band is
/// inverted.
#[allow(clippy::cast_precision_loss)]
pub fn band_limited_noise<R: Rng + ?Sized>(params: &StimulusParams, rng: &mut R) -> Result<StereoBuffer> {
    let n = params.sample_count();
    if n == 0 {
        return Err(Error::Stimulus(format!(
            "Stimulus of {}s at {} Hz is shorter than one sample",
            params.duration_secs, params.sample_rate
        )));
    }
    if params.freq_min_hz > params.freq_max_hz {
        return Err(Error::Stimulus(format!(
            "Inverted frequency band: {} Hz > {} Hz",
            params.freq_min_hz, params.freq_max_hz
        )));
    }

    let normal = Normal::new(0.0f64, 1.0)
        .map_err(|e| Error::Stimulus(format!("Failed to create noise distribution: {e}")))?;
    let mut spectrum: Vec<Complex<f64>> = (0..n).map(|_| Complex::new(normal.sample(rng), 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut spectrum);

    let bin_width = f64::from(params.sample_rate) / n as f64;
    let freq_min = f64::from(params.freq_min_hz);
    let freq_max = f64::from(params.freq_max_hz);
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let freq = k.min(n - k) as f64 * bin_width;
        if freq < freq_min || freq > freq_max {
            *bin = Complex::new(0.0, 0.0);
        }
    }

    planner.plan_fft_inverse(n).process(&mut spectrum);

    let peak = spectrum.iter().map(|c| c.re.abs()).fold(0.0, f64::max);
    let scale = if peak > EPSILON { 1.0 / peak } else { 0.0 };
    #[allow(clippy::cast_possible_truncation)]
    let noise: Vec<f32> = spectrum.iter().map(|c| (c.re * scale) as f32).collect();

    let silence = vec![0.0f32; n];
    let (left, right) = match (params.left_enabled, params.right_enabled) {
        (true, true) => (noise.clone(), noise),
        (true, false) => (noise, silence),
        (false, true) => (silence, noise),
        (false, false) => (silence.clone(), silence),
    };

    Ok(StereoBuffer {
        left,
        right,
        sample_rate: params.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn params(left: bool, right: bool) -> StimulusParams {
        StimulusParams {
            sample_rate: 44_100,
            duration_secs: 0.2,
            freq_min_hz: 9000,
            freq_max_hz: 12000,
            left_enabled: left,
            right_enabled: right,
        }
    }

    #[test]
    fn test_buffer_length_and_peak() {
        let mut rng = StdRng::seed_from_u64(11);
        let buffer = band_limited_noise(&params(true, true), &mut rng).unwrap();

        assert_eq!(buffer.frames(), 8820);
        assert_eq!(buffer.right.len(), 8820);
        assert_eq!(buffer.duration(), Duration::from_millis(200));

        let peak = buffer.left.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
        assert_eq!(buffer.left, buffer.right);
    }

    #[test]
    fn test_both_channels_muted() {
        let mut rng = StdRng::seed_from_u64(3);
        let buffer = band_limited_noise(&params(false, false), &mut rng).unwrap();
        assert!(buffer.left.iter().all(|&s| s == 0.0));
        assert!(buffer.right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_interleaved_order() {
        let buffer = StereoBuffer {
            left: vec![1.0, 2.0],
            right: vec![-1.0, -2.0],
            sample_rate: 2,
        };
        assert_eq!(buffer.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_rejects_empty_stimulus() {
        let mut short = params(true, true);
        short.duration_secs = 1e-6;
        assert!(matches!(generate(&short), Err(Error::Stimulus(_))));
    }

    #[test]
    fn test_rejects_inverted_band() {
        let mut inverted = params(true, true);
        inverted.freq_min_hz = 12000;
        inverted.freq_max_hz = 9000;
        assert!(generate(&inverted).is_err());
    }
}
