//! Tests for command-line argument parsing and configuration overrides

use clap::Parser;
use head_movement_feedback::{camera::VideoSource, cli::Cli, config::Config};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("head-movement-feedback").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_default_arguments() {
    let cli = parse(&[]);
    assert_eq!(cli.cam, 0);
    assert_eq!(cli.video, None);
    assert_eq!(cli.gui, None);
    assert_eq!(cli.left, None);
    assert_eq!(cli.right, None);
    assert!(!cli.interactive);
    assert!(!cli.debug);
    assert_eq!(cli.video_source(), VideoSource::Camera(0));
}

#[test]
fn test_video_file_takes_precedence() {
    let cli = parse(&["--cam", "2", "--video", "session.mp4"]);
    assert_eq!(cli.video_source(), VideoSource::File("session.mp4".to_string()));

    let cli = parse(&["--cam", "2"]);
    assert_eq!(cli.video_source(), VideoSource::Camera(2));
}

#[test]
fn test_stimulus_overrides() {
    let cli = parse(&[
        "--threshold",
        "20",
        "--interval",
        "1.5",
        "--duration",
        "0.4",
        "--freq-min",
        "4000",
        "--freq-max",
        "8000",
        "--sample-rate",
        "48000",
        "--left",
    ]);
    let mut config = Config::default();
    cli.apply_overrides(&mut config);

    let stimulus = &config.stimulus;
    assert_eq!(stimulus.threshold_movement, 20.0);
    assert_eq!(stimulus.interval_secs, 1.5);
    assert_eq!(stimulus.duration_secs, 0.4);
    assert_eq!(stimulus.freq_min_hz, 4000);
    assert_eq!(stimulus.freq_max_hz, 8000);
    assert_eq!(stimulus.sample_rate, 48_000);
    assert!(stimulus.left_ear);
    assert!(!stimulus.right_ear);
}

#[test]
fn test_overrides_leave_file_values_alone() {
    let mut config = Config::default();
    config.stimulus.threshold_movement = 30.0;
    config.stimulus.right_ear = true;

    parse(&["--duration", "0.5"]).apply_overrides(&mut config);

    assert_eq!(config.stimulus.threshold_movement, 30.0);
    assert!(config.stimulus.right_ear);
    assert_eq!(config.stimulus.duration_secs, 0.5);
}

#[test]
fn test_display_flags() {
    let mut config = Config::default();
    parse(&["--gui", "off", "--flip"]).apply_overrides(&mut config);
    assert!(!config.display.show_window);
    assert!(config.display.flip_x);

    parse(&["--gui", "on"]).apply_overrides(&mut config);
    assert!(config.display.show_window);
}

#[test]
fn test_file_display_setting_survives_without_gui_flag() {
    let path = std::env::temp_dir().join(format!("hmf-{}-headless.yaml", std::process::id()));
    std::fs::write(&path, "display:\n  show_window: false\n").unwrap();

    let cli = parse(&["--config", path.to_str().unwrap()]);
    let config = cli.load_config().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(!config.display.show_window);
}

#[test]
fn test_ears_can_be_switched_off() {
    let mut config = Config::default();
    config.stimulus.right_ear = true;
    config.stimulus.left_ear = true;

    parse(&["--right=false", "--left", "false"]).apply_overrides(&mut config);
    assert!(!config.stimulus.right_ear);
    assert!(!config.stimulus.left_ear);

    parse(&["--right"]).apply_overrides(&mut config);
    assert!(config.stimulus.right_ear);
    assert!(!config.stimulus.left_ear);
}

#[test]
fn test_unknown_gui_mode_is_rejected() {
    assert!(Cli::try_parse_from(["head-movement-feedback", "--gui", "sometimes"]).is_err());
}

#[test]
fn test_invalid_numbers_are_rejected() {
    let bin = "head-movement-feedback";
    assert!(Cli::try_parse_from([bin, "--threshold", "far"]).is_err());
    assert!(Cli::try_parse_from([bin, "--freq-min", "-100"]).is_err());
    assert!(Cli::try_parse_from([bin, "--cam", "front"]).is_err());
}

#[test]
fn test_config_and_write_config_paths() {
    let cli = parse(&["--config", "session.yaml", "--write-config", "out.yaml", "--interactive"]);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("session.yaml")));
    assert_eq!(cli.write_config.as_deref(), Some(std::path::Path::new("out.yaml")));
    assert!(cli.interactive);
}

#[test]
fn test_load_config_without_file_applies_flags() {
    let cli = parse(&["--threshold", "5"]);
    let config = cli.load_config().unwrap();
    assert_eq!(config.stimulus.threshold_movement, 5.0);
    assert_eq!(config.stimulus.freq_max_hz, Config::default().stimulus.freq_max_hz);
}
