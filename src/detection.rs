//! Movement decision policy and the detection loop that drives it.

use crate::{
    config::StimulusConfig,
    gate::InhibitionGate,
    movement::{LandmarkPair, Movement},
    scheduler::StimulusScheduler,
    source::{FrameReport, LandmarkSource, LoopControl, Observation},
    stimulus::{StimulusEmitter, StimulusParams},
    Result,
};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Decision taken for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// No face in the frame; history is kept
    NoFace,
    /// First tracked frame; positions recorded, nothing compared
    Primed,
    /// Movement below threshold
    Still(Movement),
    /// Movement at or above threshold and a stimulus was scheduled
    Triggered(Movement),
    /// Movement at or above threshold while a stimulus was playing
    Suppressed(Movement),
}

impl FrameOutcome {
    /// Movement measured in this frame, if any
    #[must_use]
    pub const fn movement(&self) -> Option<Movement> {
        match self {
            Self::Still(m) | Self::Triggered(m) | Self::Suppressed(m) => Some(*m),
            Self::NoFace | Self::Primed => None,
        }
    }
}

/// Cross-frame detection state: landmark history, gate and scheduler
pub struct DetectionSession {
    threshold: f64,
    interval: Duration,
    params: StimulusParams,
    gate: InhibitionGate,
    scheduler: StimulusScheduler,
    previous: Option<LandmarkPair>,
}

impl DetectionSession {
    /// Create a session from a validated stimulus configuration
    #[must_use]
    pub fn new(config: &StimulusConfig, emitter: Arc<dyn StimulusEmitter>) -> Self {
        let gate = InhibitionGate::new();
        Self {
            threshold: config.threshold_movement,
            interval: config.interval(),
            params: config.params(),
            scheduler: StimulusScheduler::new(emitter, gate.clone()),
            gate,
            previous: None,
        }
    }

    /// Apply the decision policy to one frame.
    ///
    /// A trigger is accepted iff the nose or chin moved at least the threshold
    /// and the gate is not inhibited. History is updated for every frame with
    /// a face, whether or not a trigger fired.
    ///
    /// # Errors
    ///
    /// Returns an error if an accepted trigger could not be scheduled. History
    /// has already been updated in that case.
    pub fn observe(&mut self, landmarks: Option<LandmarkPair>) -> Result<FrameOutcome> {
        let Some(current) = landmarks else {
            return Ok(FrameOutcome::NoFace);
        };

        let Some(previous) = self.previous.replace(current) else {
            debug!("Tracking started at nose {:?}, chin {:?}", current.nose, current.chin);
            return Ok(FrameOutcome::Primed);
        };

        let movement = current.movement_since(&previous);
        if !movement.exceeds(self.threshold) {
            return Ok(FrameOutcome::Still(movement));
        }

        if self.gate.is_inhibited() {
            debug!("Movement {:.1}px suppressed while stimulus plays", movement.peak());
            return Ok(FrameOutcome::Suppressed(movement));
        }

        let id = self.scheduler.trigger(self.interval, self.params)?;
        info!(
            "Head movement detected (nose {:.1}px, chin {:.1}px), stimulus {} scheduled",
            movement.nose, movement.chin, id
        );
        Ok(FrameOutcome::Triggered(movement))
    }

    /// Last recorded landmark positions
    #[must_use]
    pub const fn history(&self) -> Option<LandmarkPair> {
        self.previous
    }

    /// The session's inhibition gate
    #[must_use]
    pub const fn gate(&self) -> &InhibitionGate {
        &self.gate
    }

    /// The session's stimulus scheduler
    #[must_use]
    pub const fn scheduler(&self) -> &StimulusScheduler {
        &self.scheduler
    }

    /// Cancel a waiting stimulus and let a playing one finish
    pub fn shutdown(&self) {
        if self.scheduler.cancel_pending() {
            info!("Cancelled pending stimulus on shutdown");
        }
        self.scheduler.wait_idle();
    }
}

/// External stop request shared with the detection loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    raised: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle that has not been raised
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop before the next frame
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Counters collected over one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Frames pulled successfully
    pub frames: u64,
    /// Frames with a tracked face
    pub faces: u64,
    /// Accepted triggers
    pub triggers: u64,
    /// Triggers suppressed by the gate
    pub suppressed: u64,
    /// Frames that could not be acquired
    pub acquisition_failures: u64,
}

/// Pulls frames from a landmark source and runs the decision policy on each
pub struct DetectionLoop<S: LandmarkSource> {
    source: S,
    session: DetectionSession,
    stop: StopHandle,
}

impl<S: LandmarkSource> DetectionLoop<S> {
    /// Create a loop over `source`
    pub fn new(source: S, session: DetectionSession) -> Self {
        Self {
            source,
            session,
            stop: StopHandle::new(),
        }
    }

    /// Handle that stops the loop from another thread
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The detection session driven by this loop
    #[must_use]
    pub const fn session(&self) -> &DetectionSession {
        &self.session
    }

    /// The landmark source
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Run until end of stream, a render-sink stop, or the stop handle is raised.
    ///
    /// Per-frame errors never end the loop. On exit a waiting stimulus is
    /// cancelled and a playing one is allowed to finish.
    ///
    /// # Errors
    ///
    /// Currently never fails, but returns Result for API consistency
    pub fn run(&mut self) -> Result<LoopSummary> {
        info!("Starting detection loop");
        let mut summary = LoopSummary::default();

        loop {
            if self.stop.is_raised() {
                info!("Stop requested");
                break;
            }

            let observation = match self.source.next_frame() {
                Ok(observation) => observation,
                Err(e) => {
                    summary.acquisition_failures += 1;
                    warn!("Could not obtain frame: {}, retrying...", e);
                    continue;
                }
            };

            let landmarks = match observation {
                Observation::EndOfStream => {
                    info!("End of input reached");
                    break;
                }
                Observation::NoFace => None,
                Observation::Face(pair) => Some(pair),
            };

            let frame_index = summary.frames;
            summary.frames += 1;
            if landmarks.is_some() {
                summary.faces += 1;
            }

            let outcome = match self.session.observe(landmarks) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to schedule stimulus: {}", e);
                    continue;
                }
            };
            match outcome {
                FrameOutcome::Triggered(_) => summary.triggers += 1,
                FrameOutcome::Suppressed(_) => summary.suppressed += 1,
                _ => {}
            }
            debug!("Frame {}: {:?}", frame_index, outcome);

            let report = FrameReport {
                frame_index,
                outcome: &outcome,
                inhibited: self.session.gate().is_inhibited(),
            };
            match self.source.present(&report) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Stop) => {
                    info!("Exit requested by user");
                    break;
                }
                Err(e) => warn!("Failed to render frame: {}", e),
            }
        }

        self.session.shutdown();
        info!(
            "Detection loop finished: {} frames, {} with face, {} triggers, {} suppressed",
            summary.frames, summary.faces, summary.triggers, summary.suppressed
        );
        Ok(summary)
    }
}
