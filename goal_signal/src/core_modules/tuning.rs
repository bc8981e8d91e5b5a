// THEORY:
// The operator steers two values while the system runs: the color threshold and the
// camera exposure. `TuningController` is their single owner. Keys nudge a value by
// one step and both values are clamped afterwards, so out-of-range input is never an
// error. Threshold changes stay internal (the detector reads them every tick).
// Exposure changes have to reach the camera, but camera writes are slow and some
// drivers misbehave on redundant writes, so a change is only handed out once.

use crate::core_modules::color::color::MAX_DISTANCE;

pub const THRESHOLD_MIN: i32 = 1;
pub const THRESHOLD_MAX: i32 = MAX_DISTANCE as i32;
pub const EXPOSURE_MIN: i32 = -7;
pub const EXPOSURE_MAX: i32 = -1;

pub const KEY_ESCAPE: i32 = 27;

/// Operator commands, decoded from raw key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ExposureUp,
    ExposureDown,
    ThresholdUp,
    ThresholdDown,
}

impl Command {
    /// Decodes a HighGUI-style key code. Only the low byte is significant, which
    /// also maps the "no key" sentinel (-1) to an unrecognized code.
    pub fn from_key_code(code: i32) -> Option<Self> {
        match code & 0xff {
            KEY_ESCAPE => Some(Command::Quit),
            c if c == b'w' as i32 => Some(Command::ExposureUp),
            c if c == b's' as i32 => Some(Command::ExposureDown),
            c if c == b'd' as i32 => Some(Command::ThresholdUp),
            c if c == b'a' as i32 => Some(Command::ThresholdDown),
            _ => None,
        }
    }
}

/// The committed tuning values after a key was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    pub threshold: i32,
    pub exposure: i32,
    pub quit_requested: bool,
}

#[derive(Debug, Clone)]
pub struct TuningController {
    threshold: i32,
    exposure: i32,
    /// Last exposure handed to the frame source. `None` until the first push.
    applied_exposure: Option<i32>,
}

impl TuningController {
    pub fn new(initial_threshold: i32, initial_exposure: i32) -> Self {
        Self {
            threshold: initial_threshold.clamp(THRESHOLD_MIN, THRESHOLD_MAX),
            exposure: initial_exposure.clamp(EXPOSURE_MIN, EXPOSURE_MAX),
            applied_exposure: None,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn exposure(&self) -> i32 {
        self.exposure
    }

    pub fn apply_key(&mut self, code: i32) -> Tuning {
        let command = Command::from_key_code(code);
        if let Some(command) = command {
            self.apply(command);
        }
        Tuning {
            threshold: self.threshold,
            exposure: self.exposure,
            quit_requested: command == Some(Command::Quit),
        }
    }

    pub fn apply(&mut self, command: Command) {
        let previous_threshold = self.threshold;
        match command {
            Command::Quit => return,
            Command::ExposureUp => self.exposure += 1,
            Command::ExposureDown => self.exposure -= 1,
            Command::ThresholdUp => self.threshold += 1,
            Command::ThresholdDown => self.threshold -= 1,
        }
        self.exposure = self.exposure.clamp(EXPOSURE_MIN, EXPOSURE_MAX);
        self.threshold = self.threshold.clamp(THRESHOLD_MIN, THRESHOLD_MAX);

        if self.threshold != previous_threshold {
            log::info!("Changing threshold to {}", self.threshold);
        }
    }

    /// Returns the exposure to push to the frame source if it differs from the last
    /// value pushed, and records it as applied.
    pub fn take_exposure_change(&mut self) -> Option<i32> {
        if self.applied_exposure == Some(self.exposure) {
            return None;
        }
        log::info!("Changing exposure to {}", self.exposure);
        self.applied_exposure = Some(self.exposure);
        Some(self.exposure)
    }
}
