//! Command line arguments and how they layer onto the configuration.
//!
//! Precedence, lowest first: built-in defaults, `--config` YAML file,
//! individual flags, then the interactive prompts.

use crate::{camera::VideoSource, config::Config, Result};
use clap::Parser;
use std::path::PathBuf;

/// Head movement contingent auditory feedback
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    pub cam: i32,

    /// Video file to process instead of a camera
    #[arg(short, long)]
    pub video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Ask for the stimulus parameters on stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Movement threshold in pixels
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Delay before the stimulus, in seconds
    #[arg(long)]
    pub interval: Option<f64>,

    /// Stimulus duration, in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Lower edge of the noise band in Hz
    #[arg(long)]
    pub freq_min: Option<u32>,

    /// Upper edge of the noise band in Hz
    #[arg(long)]
    pub freq_max: Option<u32>,

    /// Play the stimulus in the left ear (`--left=false` turns it off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub left: Option<bool>,

    /// Play the stimulus in the right ear (`--right=false` turns it off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub right: Option<bool>,

    /// Output sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// GUI display mode (on, off); the configuration file decides when omitted
    #[arg(short, long, value_parser = ["on", "off", "none"])]
    pub gui: Option<String>,

    /// Mirror the camera image horizontally
    #[arg(long)]
    pub flip: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Selected video source
    #[must_use]
    pub fn video_source(&self) -> VideoSource {
        self.video
            .clone()
            .map_or(VideoSource::Camera(self.cam), VideoSource::File)
    }

    /// Load the configuration file, if any, and apply flag overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Config::from_file(path)?
            }
            None => Config::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Overwrite configuration values given on the command line
    pub fn apply_overrides(&self, config: &mut Config) {
        let stimulus = &mut config.stimulus;
        if let Some(threshold) = self.threshold {
            stimulus.threshold_movement = threshold;
        }
        if let Some(interval) = self.interval {
            stimulus.interval_secs = interval;
        }
        if let Some(duration) = self.duration {
            stimulus.duration_secs = duration;
        }
        if let Some(freq_min) = self.freq_min {
            stimulus.freq_min_hz = freq_min;
        }
        if let Some(freq_max) = self.freq_max {
            stimulus.freq_max_hz = freq_max;
        }
        if let Some(sample_rate) = self.sample_rate {
            stimulus.sample_rate = sample_rate;
        }
        if let Some(left) = self.left {
            stimulus.left_ear = left;
        }
        if let Some(right) = self.right {
            stimulus.right_ear = right;
        }

        if let Some(gui) = &self.gui {
            config.display.show_window = !matches!(gui.as_str(), "off" | "none");
        }
        if self.flip {
            config.display.flip_x = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["head-movement-feedback"]).unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, Config::default());
        assert_eq!(cli.video_source(), VideoSource::Camera(0));
    }
}
