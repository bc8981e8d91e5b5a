// THEORY:
// `SignalConfig` is the startup configuration of the operator console. Everything
// here is fixed for the life of the process; only the threshold and exposure change
// at runtime, and those are owned by `TuningController`, which is seeded from
// `initial_threshold` / `initial_exposure`.
//
// Key principles:
// 1.  **Layered**: defaults, then an optional JSON file (missing fields keep their
//     defaults), then `GOAL_SIGNAL_ROBOT_*` environment variables, then CLI flags.
// 2.  **Checked once**: `validate` rejects anything that would later panic or block,
//     so the building blocks it hands out can be constructed without failing.
// 3.  **Resolved once**: the robot host is looked up when the connector is built,
//     never from inside the send loop.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core_modules::layout::CanvasLayout;
use crate::core_modules::robot_link::{LinkTiming, TcpConnector};
use crate::core_modules::tuning::{EXPOSURE_MAX, EXPOSURE_MIN, THRESHOLD_MAX, THRESHOLD_MIN};
use crate::error::{Result, SignalError};

pub const ENV_ROBOT_HOST: &str = "GOAL_SIGNAL_ROBOT_HOST";
pub const ENV_ROBOT_PORT: &str = "GOAL_SIGNAL_ROBOT_PORT";
/// Slowest accepted send rate; one byte every 1000 s.
pub const MIN_SEND_RATE_HZ: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Address of the robot controller.
    pub robot_host: String,
    pub robot_port: u16,
    /// Maximum transmissions per second.
    pub send_rate_hz: f64,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Delay after a failed connect before trying again.
    pub reconnect_backoff_ms: u64,
    /// Width of the whole operator canvas.
    pub canvas_width: u32,
    /// Camera frames are resized to this before anything else.
    pub frame_width: u32,
    pub frame_height: u32,
    pub initial_exposure: i32,
    pub initial_threshold: i32,
    /// Key poll wait per loop iteration; also caps the loop rate.
    pub key_poll_ms: i32,
    pub camera_index: i32,
    pub window_name: String,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            robot_host: "10.2.54.2".to_string(),
            robot_port: 1180,
            send_rate_hz: 40.0,
            connect_timeout_ms: 100,
            write_timeout_ms: 100,
            reconnect_backoff_ms: 1000,
            canvas_width: 1000,
            frame_width: 640,
            frame_height: 360,
            initial_exposure: -4,
            initial_threshold: 100,
            key_poll_ms: 10,
            camera_index: 0,
            window_name: "Goal Signal".to_string(),
        }
    }
}

impl SignalConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SignalConfig = serde_json::from_str(&contents)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies `GOAL_SIGNAL_ROBOT_HOST` / `GOAL_SIGNAL_ROBOT_PORT` when set.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup(ENV_ROBOT_HOST).filter(|h| !h.is_empty()) {
            self.robot_host = host;
        }
        if let Some(port) = lookup(ENV_ROBOT_PORT).filter(|p| !p.is_empty()) {
            self.robot_port = port
                .parse()
                .map_err(|_| SignalError::InvalidConfig(format!("{ENV_ROBOT_PORT}={port} is not a port number")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.robot_host.is_empty() {
            return Err(SignalError::InvalidConfig("robot_host is empty".to_string()));
        }
        if !(self.send_rate_hz.is_finite() && self.send_rate_hz >= MIN_SEND_RATE_HZ) {
            return Err(SignalError::InvalidConfig(format!(
                "send_rate_hz must be at least {MIN_SEND_RATE_HZ}, got {}",
                self.send_rate_hz
            )));
        }
        self.link_timing()?;
        if self.connect_timeout_ms == 0 || self.write_timeout_ms == 0 {
            // A zero timeout means "block forever" to the socket layer.
            return Err(SignalError::InvalidConfig("network timeouts must be non-zero".to_string()));
        }
        if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.initial_threshold) {
            return Err(SignalError::InvalidConfig(format!(
                "initial_threshold {} outside {THRESHOLD_MIN}..={THRESHOLD_MAX}",
                self.initial_threshold
            )));
        }
        if !(EXPOSURE_MIN..=EXPOSURE_MAX).contains(&self.initial_exposure) {
            return Err(SignalError::InvalidConfig(format!(
                "initial_exposure {} outside {EXPOSURE_MIN}..={EXPOSURE_MAX}",
                self.initial_exposure
            )));
        }
        if self.key_poll_ms <= 0 {
            // waitKey(0) blocks until a key is pressed.
            return Err(SignalError::InvalidConfig("key_poll_ms must be positive".to_string()));
        }
        self.layout().map(|_| ())
    }

    pub fn layout(&self) -> Result<CanvasLayout> {
        CanvasLayout::new(self.canvas_width, self.frame_width, self.frame_height)
    }

    pub fn link_timing(&self) -> Result<LinkTiming> {
        LinkTiming::from_rate(self.send_rate_hz, Duration::from_millis(self.reconnect_backoff_ms)).ok_or_else(|| {
            SignalError::InvalidConfig(format!("send_rate_hz {} has no representable period", self.send_rate_hz))
        })
    }

    /// Resolves the robot endpoint. This is the only name lookup the link does.
    pub fn connector(&self) -> Result<TcpConnector> {
        let connector = TcpConnector::new(&self.robot_host, self.robot_port).map_err(|err| {
            SignalError::InvalidConfig(format!("cannot resolve robot {}:{}: {err}", self.robot_host, self.robot_port))
        })?;
        Ok(connector
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_write_timeout(Duration::from_millis(self.write_timeout_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::robot_link::Connector;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SignalConfig::default();
        config.validate().expect("default config validates");
        assert_eq!(config.link_timing().expect("timing"), LinkTiming::default());
        assert_eq!(config.robot_port, crate::core_modules::receiver::DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "robot_host": "127.0.0.1", "initial_threshold": 150 }}"#).expect("write");

        let config = SignalConfig::load(file.path()).expect("load");
        assert_eq!(config.robot_host, "127.0.0.1");
        assert_eq!(config.initial_threshold, 150);
        assert_eq!(config.robot_port, 1180);
        assert_eq!(config.canvas_width, 1000);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "robot_host = 1").expect("write");
        assert!(matches!(SignalConfig::load(file.path()), Err(SignalError::ConfigParse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.json");
        assert!(matches!(SignalConfig::load(&missing), Err(SignalError::ConfigIo(_))));
    }

    #[test]
    fn env_overrides_endpoint() {
        let env: HashMap<&str, &str> = [(ENV_ROBOT_HOST, "192.168.1.20"), (ENV_ROBOT_PORT, "5800")].into();
        let mut config = SignalConfig::default();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .expect("env applies");
        assert_eq!(config.robot_host, "192.168.1.20");
        assert_eq!(config.robot_port, 5800);
        let connector = config.connector().expect("literal address resolves");
        assert_eq!(connector.endpoint(), "192.168.1.20:5800");
        let expected: std::net::SocketAddr = "192.168.1.20:5800".parse().expect("addr");
        assert_eq!(connector.addrs(), [expected].as_slice());
    }

    #[test]
    fn bad_env_port_is_rejected() {
        let mut config = SignalConfig::default();
        let result = config.apply_env_from(|key| (key == ENV_ROBOT_PORT).then(|| "robot".to_string()));
        assert!(matches!(result, Err(SignalError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases: [fn(&mut SignalConfig); 13] = [
            |c| c.send_rate_hz = 0.0,
            |c| c.send_rate_hz = f64::NAN,
            |c| c.send_rate_hz = f64::INFINITY,
            |c| c.send_rate_hz = 1e-30,
            |c| c.send_rate_hz = 1e-4,
            |c| c.connect_timeout_ms = 0,
            |c| c.initial_threshold = 0,
            |c| c.initial_threshold = 691,
            |c| c.initial_exposure = 0,
            |c| c.initial_exposure = -8,
            |c| c.key_poll_ms = 0,
            |c| c.canvas_width = 500,
            |c| c.robot_host.clear(),
        ];
        for mutate in cases {
            let mut config = SignalConfig::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn slow_but_valid_rate_builds_a_pipeline_timing() {
        let config = SignalConfig {
            send_rate_hz: MIN_SEND_RATE_HZ,
            ..SignalConfig::default()
        };
        config.validate().expect("slowest rate validates");
        let period = config.link_timing().expect("timing").period;
        assert!(period > Duration::from_secs(999) && period < Duration::from_secs(1001), "{period:?}");
    }

    #[test]
    fn unresolvable_host_is_a_config_error() {
        let config = SignalConfig {
            robot_host: "robot host with spaces".to_string(),
            ..SignalConfig::default()
        };
        assert!(matches!(config.connector(), Err(SignalError::InvalidConfig(_))));
    }
}
