//! Frame-to-frame movement estimation for tracked facial landmarks.
//!
//! Movement is the Euclidean pixel distance a landmark travelled between two
//! consecutive frames. Only the nose tip and the chin are tracked.

use serde::{Deserialize, Serialize};

/// A 2-D landmark position in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal pixel coordinate
    pub x: f64,
    /// Vertical pixel coordinate
    pub y: f64,
}

impl Landmark {
    /// Create a landmark from pixel coordinates
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Landmark {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two landmark positions
#[must_use]
pub fn distance(previous: Landmark, current: Landmark) -> f64 {
    (current.x - previous.x).hypot(current.y - previous.y)
}

/// Nose tip and chin positions for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPair {
    /// Nose tip position
    pub nose: Landmark,
    /// Chin position
    pub chin: Landmark,
}

impl LandmarkPair {
    /// Create a landmark pair
    #[must_use]
    pub const fn new(nose: Landmark, chin: Landmark) -> Self {
        Self { nose, chin }
    }

    /// Movement of both landmarks relative to an earlier frame
    #[must_use]
    pub fn movement_since(&self, previous: &Self) -> Movement {
        Movement {
            nose: distance(previous.nose, self.nose),
            chin: distance(previous.chin, self.chin),
        }
    }
}

/// Per-landmark movement magnitudes between two frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Movement {
    /// Distance travelled by the nose tip
    pub nose: f64,
    /// Distance travelled by the chin
    pub chin: f64,
}

impl Movement {
    /// Largest of the two magnitudes
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.nose.max(self.chin)
    }

    /// Whether either landmark moved at least `threshold` pixels (inclusive)
    #[must_use]
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.nose >= threshold || self.chin >= threshold
    }
}
