//! Calibrate once, then drive gates frame by frame until the time budget runs out

use anyhow::Context;
use image::imageops;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::controller::{FrameOutcome, GateController};
use crate::config::{BotConfig, SessionConfig};
use crate::detection::TrainScan;
use crate::graph::{DirectionResolver, GridBuilder};
use crate::traits::{Actuator, Detector, FrameSource, LineProbe};

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: usize,
    /// Frames dropped by the station-count check
    pub skipped: usize,
    /// Frames lost to capture or detection errors
    pub failed: usize,
    pub actuations: usize,
}

pub struct Session<S, D, A> {
    source: S,
    detector: D,
    actuator: A,
    controller: GateController,
    config: SessionConfig,
}

impl<S: FrameSource, D: Detector, A: Actuator> Session<S, D, A> {
    /// Capture a calibration frame and build the routing graph from it
    pub fn calibrate(
        mut source: S,
        detector: D,
        probe: &dyn LineProbe,
        actuator: A,
        config: &BotConfig,
    ) -> anyhow::Result<Self> {
        let frame = source
            .capture()
            .context("Failed to capture calibration frame")?;
        let layout = detector
            .detect_layout(&frame)
            .context("Failed to detect board layout")?;
        info!(
            "Calibration: {} markers, {} stations",
            layout.markers.len(),
            layout.station_count
        );

        let mut graph = GridBuilder::new(&config.grid).build(&layout.markers)?;
        let gray = imageops::grayscale(&frame);
        DirectionResolver::new(&config.discovery, &gray, probe).resolve(&mut graph)?;
        debug!("Calibrated graph:\n{}", graph);

        Ok(Self {
            source,
            detector,
            actuator,
            controller: GateController::new(graph, layout.station_count, config),
            config: config.session.clone(),
        })
    }

    pub fn controller(&self) -> &GateController {
        &self.controller
    }

    /// Process one frame, clicking every gate that must change
    pub fn step(&mut self) -> anyhow::Result<FrameOutcome> {
        let scan = self.sense()?;
        self.decide(&scan)
    }

    /// Run frames until the duration or frame limit is reached
    pub fn run(&mut self) -> anyhow::Result<SessionSummary> {
        let started = Instant::now();
        let budget = self.config.duration();
        let mut summary = SessionSummary::default();

        loop {
            if self.config.max_frames.is_some_and(|max| summary.frames >= max) {
                break;
            }

            let frame_started = Instant::now();
            match self.sense() {
                Ok(scan) => match self.decide(&scan)? {
                    FrameOutcome::Skipped(_) => summary.skipped += 1,
                    FrameOutcome::Routed(report) => summary.actuations += report.actuations.len(),
                },
                Err(err) => {
                    warn!("Frame {} dropped: {:#}", summary.frames, err);
                    summary.failed += 1;
                }
            }
            summary.frames += 1;
            debug!("Frame {} took {:?}", summary.frames, frame_started.elapsed());

            if started.elapsed() > budget {
                break;
            }
        }

        info!(
            "Session finished: {} frames, {} skipped, {} failed, {} actuations",
            summary.frames, summary.skipped, summary.failed, summary.actuations
        );
        Ok(summary)
    }

    fn sense(&mut self) -> anyhow::Result<TrainScan> {
        let frame = self.source.capture().context("Frame capture failed")?;
        self.detector
            .detect_trains(&frame)
            .context("Train detection failed")
    }

    /// Click every pending gate and commit only the clicks that went through.
    ///
    /// A failed click leaves its gate pending for the next frame; the other
    /// clicks of the frame are still attempted and the first failure is
    /// returned.
    fn decide(&mut self, scan: &TrainScan) -> anyhow::Result<FrameOutcome> {
        let outcome = self.controller.step(scan);
        let mut failure = None;
        for actuation in outcome.actuations() {
            let (x, y) = actuation.screen;
            match self.actuator.click(x, y) {
                Ok(()) => self.controller.confirm(actuation),
                Err(err) => {
                    warn!("Click on gate #{} failed: {:#}", actuation.gate, err);
                    if failure.is_none() {
                        failure = Some(
                            err.context(format!("Failed to switch gate #{}", actuation.gate)),
                        );
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }
}
