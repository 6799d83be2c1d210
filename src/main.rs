//! Eye controlled mouse: iris tracking moves the pointer, blinks click.

use anyhow::{Context, Result};
use clap::Parser;
use eye_mouse::{
    app::{install_interrupt_handler, EyeMouseApp},
    capture::VideoSource,
    config::{Config, EXAMPLE_CONFIG},
};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Video file to process instead of a camera
    #[arg(short, long)]
    video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Write the example configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Path to the face mesh ONNX model
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to the face detector ONNX model
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Smoothing factor (>= 1)
    #[arg(short, long)]
    smoothing: Option<f64>,

    /// Eye aperture below which a frame counts as a blink
    #[arg(long)]
    blink_threshold: Option<f64>,

    /// Minimum seconds between clicks
    #[arg(long)]
    cooldown: Option<f64>,

    /// Seconds within which a second blink triggers close window
    #[arg(long)]
    double_blink_window: Option<f64>,

    /// Frame margin in pixels excluded from mapping
    #[arg(long)]
    margin: Option<f64>,

    /// Run without the preview window
    #[arg(long)]
    no_preview: bool,

    /// Do not mirror the camera image
    #[arg(long)]
    no_mirror: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Apply command line overrides on top of file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(cam) = self.cam {
            config.camera.index = cam;
        }
        if let Some(model) = &self.model {
            config.model.face_mesh = model.clone();
        }
        if let Some(model) = &self.detector_model {
            config.model.face_detector = model.clone();
        }
        if let Some(factor) = self.smoothing {
            config.smoothing.factor = factor;
        }
        if let Some(threshold) = self.blink_threshold {
            config.blink.threshold = threshold;
        }
        if let Some(cooldown) = self.cooldown {
            config.blink.click_cooldown_secs = cooldown;
        }
        if let Some(window) = self.double_blink_window {
            config.blink.double_blink_window_secs = window;
        }
        if let Some(margin) = self.margin {
            config.mapping.frame_margin = margin;
        }
        if self.no_preview {
            config.preview.enabled = false;
        }
        if self.no_mirror {
            config.camera.mirror = false;
        }
    }

    fn video_source(&self, config: &Config) -> VideoSource {
        self.video
            .clone()
            .map_or(VideoSource::Camera(config.camera.index), VideoSource::File)
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_config {
        std::fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Example configuration written to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        Config::default()
    };
    args.apply(&mut config);

    let shutdown = install_interrupt_handler().context("Failed to install signal handler")?;

    let mut app = match EyeMouseApp::new(&config, &args.video_source(&config)) {
        Ok(app) => app,
        Err(e) => {
            error!("Initialization failed: {e}");
            return Err(e.into());
        }
    };

    let summary = app.run(shutdown);
    drop(app);
    info!("Resources released successfully");

    Ok(ExitCode::from(u8::try_from(summary.reason.exit_code()).unwrap_or(1)))
}
