//! Head movement feedback: camera-based head tracking that plays a noise burst
//! whenever the head moves suddenly.

use anyhow::{Context, Result};
use clap::Parser;
use head_movement_feedback::{
    app::{AppConfig, FeedbackApp},
    cli::Cli,
};
use log::info;
use std::io;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Head Movement Feedback");

    let mut config = args.load_config().context("Failed to load configuration")?;

    if args.interactive {
        let stdin = io::stdin();
        config
            .stimulus
            .prompt(&mut stdin.lock(), &mut io::stdout())
            .context("Failed to read stimulus parameters")?;
    }

    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.write_config {
        config
            .to_file(path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let mut app = FeedbackApp::new(AppConfig {
        video_source: args.video_source(),
        config,
    })?;
    let summary = app.run()?;
    info!("Processed {} frames, {} stimuli triggered", summary.frames, summary.triggers);

    Ok(())
}
