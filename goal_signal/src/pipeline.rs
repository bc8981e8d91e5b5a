// THEORY:
// The `pipeline` module is the top-level API of the library. It owns the per-process
// state (layout, tuning, robot link) and runs one tick of the detector for a frame:
//
//     HSV canvas -> sample x3 -> detect (current threshold) -> link tick
//
// The frame source, rendering and key capture stay with the caller; this struct
// only consumes an HSV canvas and raw key codes, and hands back what the caller
// needs to draw and to drive the camera. The decision sent in a tick is always the
// one computed from that tick's frame.

use std::time::Instant;

use crate::config::SignalConfig;
use crate::core_modules::color::color::Color;
use crate::core_modules::detector::{detect_with_distances, Decision, SideDistances};
use crate::core_modules::layout::{CanvasLayout, RegionName};
use crate::core_modules::region::{sample, HsvImage};
use crate::core_modules::robot_link::{Connector, ConnectionState, RobotLink, TcpConnector, TickOutcome};
use crate::core_modules::tuning::{Tuning, TuningController};
use crate::error::{Result, SignalError};

/// Mean colors of the three regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSamples {
    pub calibration: Color,
    pub left: Color,
    pub right: Color,
}

/// Everything one tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub samples: RegionSamples,
    pub distances: SideDistances,
    pub threshold: i32,
    pub decision: Decision,
    pub link: TickOutcome,
    pub connection: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

pub struct SignalPipeline<C: Connector = TcpConnector> {
    layout: CanvasLayout,
    tuning: TuningController,
    link: RobotLink<C>,
}

impl SignalPipeline<TcpConnector> {
    pub fn from_config(config: &SignalConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout()?;
        let tuning = TuningController::new(config.initial_threshold, config.initial_exposure);
        let link = RobotLink::new(config.connector()?, config.link_timing()?);
        Ok(Self::new(layout, tuning, link))
    }
}

impl<C: Connector> SignalPipeline<C> {
    pub fn new(layout: CanvasLayout, tuning: TuningController, link: RobotLink<C>) -> Self {
        Self { layout, tuning, link }
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    pub fn threshold(&self) -> i32 {
        self.tuning.threshold()
    }

    pub fn exposure(&self) -> i32 {
        self.tuning.exposure()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Samples the three regions of an HSV canvas.
    pub fn sample_regions(&self, canvas: &HsvImage) -> Result<RegionSamples> {
        let (width, height) = self.layout.canvas_size();
        if canvas.width() != width || canvas.height() != height {
            return Err(SignalError::FrameSizeMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: canvas.width(),
                actual_height: canvas.height(),
            });
        }
        let sample_named = |name: RegionName| sample(canvas, name.as_str(), self.layout.region(name));
        Ok(RegionSamples {
            calibration: sample_named(RegionName::Calibration)?,
            left: sample_named(RegionName::Left)?,
            right: sample_named(RegionName::Right)?,
        })
    }

    /// Runs one tick: sample, detect with the current threshold, hand the decision
    /// to the robot link. Network trouble shows up in `FrameReport::link`, never as
    /// an error; errors here are sampling misconfiguration.
    pub fn process_frame(&mut self, canvas: &HsvImage, now: Instant) -> Result<FrameReport> {
        let samples = self.sample_regions(canvas)?;
        let threshold = self.tuning.threshold();
        let (decision, distances) =
            detect_with_distances(&samples.calibration, &samples.left, &samples.right, threshold);
        let link = self.link.tick(now, decision);

        Ok(FrameReport {
            samples,
            distances,
            threshold,
            decision,
            link,
            connection: self.link.state(),
        })
    }

    pub fn apply_key(&mut self, code: i32) -> KeyOutcome {
        let Tuning { quit_requested, .. } = self.tuning.apply_key(code);
        if quit_requested {
            KeyOutcome::Quit
        } else {
            KeyOutcome::Continue
        }
    }

    /// Exposure to push to the camera, only when it changed since the last push.
    pub fn take_exposure_change(&mut self) -> Option<i32> {
        self.tuning.take_exposure_change()
    }

    pub fn shutdown(&mut self) {
        self.link.disconnect();
    }
}
