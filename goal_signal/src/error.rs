// THEORY:
// Every fallible operation in the library reports a `SignalError`. Only
// configuration-time problems live here: a region that shrinks to nothing, a
// region that falls outside the frame, or a config file that cannot be read.
// Network failures never show up as a `SignalError`; the robot link absorbs
// them and reports a `TickOutcome` instead.

use thiserror::Error;

use crate::core_modules::region::Region;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("region {name} is empty after shrinking by {inset}px: {region:?}")]
    EmptyRegion {
        name: &'static str,
        region: Region,
        inset: u32,
    },

    #[error("region {name} {region:?} does not fit inside a {width}x{height} frame")]
    RegionOutOfBounds {
        name: &'static str,
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("frame is {actual_width}x{actual_height}, layout expects {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SignalError>;
