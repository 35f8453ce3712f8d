//! Stimulus playback on the system audio output.

use super::{noise, StimulusEmitter, StimulusParams};
use crate::{
    constants::{PLAYBACK_DRAIN_MS, PLAYBACK_GRACE_MS},
    error::{AppError, Result},
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;

/// Plays stimuli on the default output device of the default host.
///
/// The device is looked up again for every emission so the emitter itself
/// holds no platform handles and can be shared across worker threads.
pub struct AudioEmitter {
    device_name: String,
}

impl AudioEmitter {
    /// Check that a default output device exists
    ///
    /// # Errors
    ///
    /// Returns an error if the host has no default output device.
    pub fn open_default() -> Result<Self> {
        info!("Initializing audio output");
        let device = default_output_device()?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!("Using audio output device: {}", device_name);

        Ok(Self { device_name })
    }

    /// Name of the device selected at startup
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl StimulusEmitter for AudioEmitter {
    fn emit(&self, params: &StimulusParams) -> Result<()> {
        let buffer = noise::generate(params)?;
        let playback_time = buffer.duration();
        let samples = buffer.interleaved();
        let total = samples.len();

        let device = default_output_device()?;
        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        let mut position = 0usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = samples.get(position).copied().unwrap_or(0.0);
                        position = position.saturating_add(1);
                    }
                    if position >= total {
                        let _ = done_tx.try_send(());
                    }
                },
                |err| error!("Audio output stream error: {err}"),
                None,
            )
            .map_err(|e| AppError::Audio(format!("Failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| AppError::Audio(format!("Failed to start output stream: {e}")))?;
        debug!("Playing {} frames on {}", total / 2, self.device_name);

        if done_rx
            .recv_timeout(playback_time + Duration::from_millis(PLAYBACK_GRACE_MS))
            .is_err()
        {
            warn!("Output stream did not drain within {:?}", playback_time);
        }
        thread::sleep(Duration::from_millis(PLAYBACK_DRAIN_MS));

        Ok(())
    }

    fn name(&self) -> &str {
        "AudioEmitter"
    }
}

fn default_output_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AppError::Audio("No default output device".to_string()))
}
