//! Tests for the movement decision policy and the detection loop


use head_movement_feedback::{
    config::StimulusConfig,
    detection::{DetectionLoop, DetectionSession, FrameOutcome},
    source::Observation,
    Result,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_helpers::{pair, stimulus_config, wait_for, FailingEmitter, RecordingEmitter, ScriptedSource, Step};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_right_ear_scenario() -> Result<()> {
    let config = StimulusConfig {
        right_ear: true,
        ..StimulusConfig::default()
    };
    let emitter = RecordingEmitter::playing_for(Duration::from_millis(200));
    let mut session = DetectionSession::new(&config, emitter.clone());

    // Frame 1 only records history
    let outcome = session.observe(Some(pair((100.0, 100.0), (100.0, 140.0))))?;
    assert_eq!(outcome, FrameOutcome::Primed);
    assert_eq!(emitter.count(), 0);

    // Frame 2 moves the nose 13 pixels
    let outcome = session.observe(Some(pair((100.0, 113.0), (100.0, 140.0))))?;
    match outcome {
        FrameOutcome::Triggered(movement) => {
            assert!((movement.nose - 13.0).abs() < 1e-9);
            assert!(movement.chin.abs() < 1e-9);
        }
        other => panic!("expected a trigger, got {other:?}"),
    }

    assert!(wait_for(TIMEOUT, || session.gate().is_inhibited()));

    // Frame 3 jumps far away while the stimulus is still playing
    let outcome = session.observe(Some(pair((200.0, 300.0), (200.0, 340.0))))?;
    assert!(matches!(outcome, FrameOutcome::Suppressed(_)));

    session.shutdown();
    assert!(!session.gate().is_inhibited());

    let emissions = emitter.emissions();
    assert_eq!(emissions.len(), 1);
    let params = emissions[0].1;
    assert!(params.right_enabled);
    assert!(!params.left_enabled);
    assert_eq!((params.freq_min_hz, params.freq_max_hz), (9000, 12000));
    assert!((params.duration_secs - 0.2).abs() < f64::EPSILON);

    let stats = session.scheduler().stats();
    assert_eq!(stats.scheduled, 1);
    assert_eq!(stats.emitted, 1);
    Ok(())
}

#[test]
fn test_threshold_is_inclusive() -> Result<()> {
    for (x, expect_trigger) in [(11.0, false), (12.0, true), (12.5, true)] {
        let mut session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
        session.observe(Some(pair((0.0, 0.0), (0.0, 50.0))))?;

        let outcome = session.observe(Some(pair((x, 0.0), (0.0, 50.0))))?;
        assert_eq!(
            matches!(outcome, FrameOutcome::Triggered(_)),
            expect_trigger,
            "x = {x}: {outcome:?}"
        );
        assert_eq!(session.scheduler().has_pending(), expect_trigger);
        session.shutdown();
    }
    Ok(())
}

#[test]
fn test_chin_movement_alone_triggers() -> Result<()> {
    let mut session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
    session.observe(Some(pair((0.0, 0.0), (0.0, 50.0))))?;

    let outcome = session.observe(Some(pair((0.0, 0.0), (0.0, 70.0))))?;
    assert!(matches!(outcome, FrameOutcome::Triggered(m) if m.nose == 0.0 && m.chin == 20.0));
    session.shutdown();
    Ok(())
}

#[test]
fn test_inhibited_gate_never_schedules() -> Result<()> {
    let mut session = DetectionSession::new(&stimulus_config(1.0, 30.0), RecordingEmitter::new());
    session.observe(Some(pair((0.0, 0.0), (0.0, 50.0))))?;
    session.gate().activate();

    for step in 1..20 {
        let offset = f64::from(step) * 1000.0;
        let outcome = session.observe(Some(pair((offset, offset), (offset, offset + 50.0))))?;
        assert!(matches!(outcome, FrameOutcome::Suppressed(_)));
    }

    assert_eq!(session.scheduler().stats().scheduled, 0);
    assert!(!session.scheduler().has_pending());
    session.gate().deactivate();
    Ok(())
}

#[test]
fn test_loop_counts_and_reports_frames() -> Result<()> {
    let emitter = RecordingEmitter::new();
    let session = DetectionSession::new(&stimulus_config(12.0, 30.0), emitter.clone());
    let source = ScriptedSource::new([
        Step::Frame(Observation::Face(pair((0.0, 0.0), (0.0, 50.0)))),
        Step::Frame(Observation::NoFace),
        Step::Frame(Observation::Face(pair((3.0, 0.0), (0.0, 50.0)))),
        Step::Frame(Observation::Face(pair((40.0, 0.0), (0.0, 50.0)))),
    ]);

    let mut detection = DetectionLoop::new(source, session);
    let summary = detection.run()?;

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.faces, 3);
    assert_eq!(summary.triggers, 1);
    assert_eq!(summary.suppressed, 0);
    assert_eq!(summary.acquisition_failures, 0);

    let outcomes = &detection.source_mut().outcomes;
    assert_eq!(outcomes[0], FrameOutcome::Primed);
    assert_eq!(outcomes[1], FrameOutcome::NoFace);
    assert!(matches!(outcomes[2], FrameOutcome::Still(_)));
    assert!(matches!(outcomes[3], FrameOutcome::Triggered(_)));

    // The 30 second delay was still running at end of stream, so shutdown cancelled it
    assert_eq!(emitter.count(), 0);
    assert_eq!(detection.session().scheduler().stats().superseded, 1);
    Ok(())
}

#[test]
fn test_no_face_frames_keep_history() -> Result<()> {
    let session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
    let source = ScriptedSource::new([
        Step::Frame(Observation::Face(pair((0.0, 0.0), (0.0, 50.0)))),
        Step::Frame(Observation::NoFace),
        Step::Frame(Observation::NoFace),
        Step::Frame(Observation::Face(pair((5.0, 0.0), (0.0, 50.0)))),
    ]);

    let mut detection = DetectionLoop::new(source, session);
    detection.run()?;

    // Compared against the frame before the gap, not primed again
    let last = detection.source_mut().outcomes[3];
    assert!(matches!(last, FrameOutcome::Still(m) if m.nose == 5.0));
    assert_eq!(detection.session().history(), Some(pair((5.0, 0.0), (0.0, 50.0))));
    Ok(())
}

#[test]
fn test_acquisition_failures_do_not_end_loop() -> Result<()> {
    let session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
    let source = ScriptedSource::new([
        Step::Fail,
        Step::Frame(Observation::Face(pair((0.0, 0.0), (0.0, 50.0)))),
        Step::Fail,
        Step::Fail,
        Step::Frame(Observation::Face(pair((1.0, 0.0), (0.0, 50.0)))),
    ]);

    let mut detection = DetectionLoop::new(source, session);
    let summary = detection.run()?;

    assert_eq!(summary.acquisition_failures, 3);
    assert_eq!(summary.frames, 2);
    assert!(matches!(detection.source_mut().outcomes[1], FrameOutcome::Still(_)));
    Ok(())
}

#[test]
fn test_present_stop_ends_loop() -> Result<()> {
    let session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
    let mut source = ScriptedSource::faces((0..10).map(|i| pair((f64::from(i), 0.0), (0.0, 50.0))));
    source.stop_after = Some(3);

    let mut detection = DetectionLoop::new(source, session);
    let summary = detection.run()?;

    assert_eq!(summary.frames, 3);
    assert_eq!(detection.source_mut().outcomes.len(), 3);
    Ok(())
}

#[test]
fn test_stop_handle_ends_loop_from_another_thread() -> Result<()> {
    let session = DetectionSession::new(&stimulus_config(12.0, 30.0), RecordingEmitter::new());
    let source = ScriptedSource::new(
        (0..1000).map(|_| Step::Delayed(Duration::from_millis(5), Observation::NoFace)),
    );

    let mut detection = DetectionLoop::new(source, session);
    let stop = detection.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stop.raise();
    });

    let summary = detection.run()?;
    stopper.join().unwrap();

    assert!(summary.frames > 0);
    assert!(summary.frames < 1000);
    Ok(())
}

#[test]
fn test_emission_failure_keeps_loop_running() -> Result<()> {
    let session = DetectionSession::new(&stimulus_config(12.0, 0.0), Arc::new(FailingEmitter));
    let source = ScriptedSource::new([
        Step::Frame(Observation::Face(pair((0.0, 0.0), (0.0, 50.0)))),
        Step::Frame(Observation::Face(pair((100.0, 0.0), (0.0, 50.0)))),
        // Give the zero-delay task time to start before end of stream
        Step::Delayed(Duration::from_millis(100), Observation::NoFace),
    ]);

    let mut detection = DetectionLoop::new(source, session);
    let summary = detection.run()?;

    assert_eq!(summary.triggers, 1);
    let session = detection.session();
    assert!(!session.gate().is_inhibited());
    assert_eq!(session.scheduler().stats().failed, 1);
    Ok(())
}

#[test]
fn test_shutdown_waits_for_playing_stimulus() -> Result<()> {
    let emitter = RecordingEmitter::playing_for(Duration::from_millis(100));
    let session = DetectionSession::new(&stimulus_config(12.0, 0.0), emitter.clone());
    let source = ScriptedSource::new([
        Step::Frame(Observation::Face(pair((0.0, 0.0), (0.0, 50.0)))),
        Step::Frame(Observation::Face(pair((100.0, 0.0), (0.0, 50.0)))),
        // Give the zero-delay task time to start before end of stream
        Step::Delayed(Duration::from_millis(100), Observation::NoFace),
    ]);

    let mut detection = DetectionLoop::new(source, session);
    detection.run()?;

    assert_eq!(emitter.count(), 1);
    assert_eq!(detection.session().scheduler().stats().emitted, 1);
    assert!(!detection.session().gate().is_inhibited());
    Ok(())
}
