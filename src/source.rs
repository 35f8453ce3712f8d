//! Landmark source interface consumed by the detection loop.

use crate::{detection::FrameOutcome, movement::LandmarkPair, Result};

/// Result of pulling one frame from a landmark source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// A single tracked face with its nose and chin positions
    Face(LandmarkPair),
    /// The frame was read but no face was found
    NoFace,
    /// The input is exhausted (end of a video file or script)
    EndOfStream,
}

/// Whether the detection loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Process the next frame
    Continue,
    /// Leave the loop
    Stop,
}

/// Per-frame information handed to the render sink
#[derive(Debug, Clone, Copy)]
pub struct FrameReport<'a> {
    /// Zero-based index of the processed frame
    pub frame_index: u64,
    /// Decision taken for this frame
    pub outcome: &'a FrameOutcome,
    /// Whether a stimulus is currently playing
    pub inhibited: bool,
}

/// Pull-based provider of facial landmarks, one call per loop iteration.
pub trait LandmarkSource {
    /// Acquire the next frame and extract the tracked landmarks
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be acquired or processed. The
    /// loop logs the error and retries on the next iteration.
    fn next_frame(&mut self) -> Result<Observation>;

    /// Display the frame just processed. Purely observational.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails. The loop logs it and continues.
    fn present(&mut self, _report: &FrameReport<'_>) -> Result<LoopControl> {
        Ok(LoopControl::Continue)
    }
}
