mod render;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use opencv::{
    core::{self, Mat, Size},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use goal_signal::{HsvImage, KeyOutcome, SignalConfig, SignalPipeline, TickOutcome};

/// Webcam console that tells the robot which goal is hot.
///
/// Hold a colored object in the left or right box; a box matching the color of the
/// center calibration box counts as "on". Keys: Esc quits, w/s raise/lower exposure,
/// d/a raise/lower the color threshold.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Robot controller host (overrides config and GOAL_SIGNAL_ROBOT_HOST).
    #[arg(long)]
    robot_host: Option<String>,

    /// Robot controller port (overrides config and GOAL_SIGNAL_ROBOT_PORT).
    #[arg(long)]
    robot_port: Option<u16>,

    /// Video capture device index.
    #[arg(long)]
    camera: Option<i32>,

    /// Width of the operator window.
    #[arg(long)]
    canvas_width: Option<u32>,

    /// Initial color threshold (1..=690).
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<i32>,

    /// Initial camera exposure (-7..=-1).
    #[arg(long, allow_negative_numbers = true)]
    exposure: Option<i32>,

    /// Maximum updates per second sent to the robot.
    #[arg(long)]
    send_rate: Option<f64>,
}

impl Args {
    fn resolve_config(&self) -> Result<SignalConfig> {
        let mut config = match &self.config {
            Some(path) => SignalConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => SignalConfig::default(),
        };
        config.apply_env().context("reading environment overrides")?;

        if let Some(host) = &self.robot_host {
            config.robot_host = host.clone();
        }
        if let Some(port) = self.robot_port {
            config.robot_port = port;
        }
        if let Some(camera) = self.camera {
            config.camera_index = camera;
        }
        if let Some(width) = self.canvas_width {
            config.canvas_width = width;
        }
        if let Some(threshold) = self.threshold {
            config.initial_threshold = threshold;
        }
        if let Some(exposure) = self.exposure {
            config.initial_exposure = exposure;
        }
        if let Some(rate) = self.send_rate {
            config.send_rate_hz = rate;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Configuration ---
    let args = Args::parse();
    let config = args.resolve_config()?;
    log::info!(
        "robot at {}:{}, {} Hz, threshold {}, exposure {}",
        config.robot_host,
        config.robot_port,
        config.send_rate_hz,
        config.initial_threshold,
        config.initial_exposure
    );

    // --- 2. Pipeline, Window and Camera ---
    let mut pipeline = SignalPipeline::from_config(&config)?;
    let layout = pipeline.layout().clone();

    highgui::named_window(&config.window_name, highgui::WINDOW_AUTOSIZE).context("opening window")?;

    let mut capture = VideoCapture::new(config.camera_index, videoio::CAP_ANY).context("opening camera")?;
    if !capture.is_opened()? {
        bail!("camera {} could not be opened", config.camera_index);
    }

    let frame_size = Size::new(config.frame_width as i32, config.frame_height as i32);
    let mut raw = Mat::default();
    let mut resized = Mat::default();
    let mut flipped = Mat::default();
    let mut hsv = Mat::default();

    // --- 3. Main Loop ---
    loop {
        // Push exposure before grabbing, so the initial value applies to the first frame.
        if let Some(exposure) = pipeline.take_exposure_change() {
            if !capture.set(videoio::CAP_PROP_EXPOSURE, exposure as f64)? {
                log::warn!("camera ignored exposure {}", exposure);
            }
        }

        if !capture.read(&mut raw)? || raw.empty() {
            bail!("camera stopped producing frames");
        }

        // Shrink and mirror so the operator sees themselves like in a mirror.
        imgproc::resize(&raw, &mut resized, frame_size, 0.0, 0.0, imgproc::INTER_LINEAR)?;
        core::flip(&resized, &mut flipped, 1)?;

        let mut canvas = render::draw_static(&flipped, &layout, pipeline.is_connected())?;

        imgproc::cvt_color(&canvas, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;
        let (width, height) = layout.canvas_size();
        let hsv_canvas = HsvImage::from_raw(width, height, hsv.data_bytes()?.to_vec())
            .context("HSV canvas has unexpected size")?;

        let report = pipeline.process_frame(&hsv_canvas, Instant::now())?;
        match report.link {
            TickOutcome::Sent(byte) => log::debug!(
                "sent {} (left {:.0}, right {:.0}, threshold {})",
                byte,
                report.distances.left,
                report.distances.right,
                report.threshold
            ),
            TickOutcome::Throttled | TickOutcome::ConnectFailed | TickOutcome::SendFailed => {}
        }

        render::draw_decision(&mut canvas, &layout, report.decision)?;
        highgui::imshow(&config.window_name, &canvas)?;

        // --- 4. Operator Input ---
        let key = highgui::wait_key(config.key_poll_ms)?;
        if pipeline.apply_key(key) == KeyOutcome::Quit {
            break;
        }
    }

    pipeline.shutdown();
    highgui::destroy_all_windows()?;
    log::info!("stopped");
    Ok(())
}
