//! Wiring of the detector, routing core and actuator for a command-line run

use anyhow::Context;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use switchyard_core::{Actuator, BotConfig, FrameSource, Session, SessionSummary};
use switchyard_cv::{DetectionConfig, HoughLineProbe, ImageUtils, MarkerDetector};
use tracing::info;

/// Everything a run can be configured with, as stored in the JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub detection: DetectionConfig,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path.as_ref()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path.as_ref()))
    }
}

/// Frame source that re-reads a screenshot file on every capture
pub struct ScreenshotFile {
    path: PathBuf,
}

impl ScreenshotFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for ScreenshotFile {
    fn capture(&mut self) -> anyhow::Result<RgbImage> {
        ImageUtils::load_rgb(&self.path)
    }
}

/// Logs clicks instead of performing them
#[derive(Debug, Default)]
pub struct DryRunActuator {
    pub clicks: usize,
}

impl Actuator for DryRunActuator {
    fn click(&mut self, x: f64, y: f64) -> anyhow::Result<()> {
        self.clicks += 1;
        info!("Click #{} at ({:.0}, {:.0})", self.clicks, x, y);
        Ok(())
    }
}

/// Calibrate on the first frame, then play until the session budget runs out
pub fn play(frame: PathBuf, config: &AppConfig) -> anyhow::Result<SessionSummary> {
    let detector = MarkerDetector::new(config.detection.clone());
    let probe = HoughLineProbe::new(config.detection.track_lines);

    let mut session = Session::calibrate(
        ScreenshotFile::new(frame),
        detector,
        &probe,
        DryRunActuator::default(),
        &config.bot,
    )?;
    info!("Graph ready:\n{}", session.controller().graph());
    session.run()
}
