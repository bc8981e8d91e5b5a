// THEORY:
// The detector compares the left and right samples against the calibration sample.
// A side is "on" when its color is close enough to the calibration color, i.e. the
// operator's shirt or prop fills the box. The two sides are judged independently
// against the same reference, and the comparison is strict: a distance equal to the
// threshold is not on.

use crate::core_modules::color::color::{distance, Color, Distance};

/// The per-tick output of the detector. Not carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    pub left_on: bool,
    pub right_on: bool,
}

impl Decision {
    pub const fn new(left_on: bool, right_on: bool) -> Self {
        Self { left_on, right_on }
    }

    /// Wire encoding: bit 1 is the left side, bit 0 the right side.
    pub const fn to_byte(self) -> u8 {
        ((self.left_on as u8) << 1) | (self.right_on as u8)
    }

    /// Robot-side decoding of a received byte. Bits above bit 1 are ignored.
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            left_on: byte & 0b10 != 0,
            right_on: byte & 0b01 != 0,
        }
    }
}

/// Distances of each side from the calibration sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideDistances {
    pub left: Distance,
    pub right: Distance,
}

pub fn detect(calibration: &Color, left: &Color, right: &Color, threshold: i32) -> Decision {
    detect_with_distances(calibration, left, right, threshold).0
}

pub fn detect_with_distances(
    calibration: &Color,
    left: &Color,
    right: &Color,
    threshold: i32,
) -> (Decision, SideDistances) {
    let distances = SideDistances {
        left: distance(left, calibration),
        right: distance(right, calibration),
    };
    let threshold = threshold as Distance;
    let decision = Decision {
        left_on: distances.left < threshold,
        right_on: distances.right < threshold,
    };
    (decision, distances)
}
