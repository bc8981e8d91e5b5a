// THEORY:
// This file is the main entry point for the `goal_signal` library crate. It exports
// the `SignalPipeline` and its configuration as the high-level interface used by the
// operator console, while the individual building blocks (`core_modules`) stay
// public for callers that want to drive them piecemeal:
//
// - `color`: HSV samples and the wrapped L1 color distance.
// - `region`: rectangles and mean-color sampling of an HSV image.
// - `detector`: the per-side on/off decision and its wire byte.
// - `tuning`: operator-adjusted threshold and exposure.
// - `robot_link`: the rate-limited, reconnecting link to the robot.
// - `receiver`: the robot's end of that link, with heartbeat and vote counts.
// - `layout`: the fixed geometry of the operator canvas.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::SignalConfig;
pub use core_modules::color::color::{distance, Color};
pub use core_modules::detector::{detect, Decision};
pub use core_modules::layout::CanvasLayout;
pub use core_modules::receiver::{ReceiverHandle, ReceiverState, ReceiverTiming, SignalReceiver, VoteCounts};
pub use core_modules::region::{HsvImage, Point, Region};
pub use core_modules::robot_link::{ConnectionState, Connector, LinkTiming, RobotLink, TcpConnector, TickOutcome};
pub use core_modules::tuning::TuningController;
pub use error::{Result, SignalError};
pub use pipeline::{FrameReport, KeyOutcome, SignalPipeline};
