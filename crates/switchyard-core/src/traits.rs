//! Seams to the collaborators around the routing core

use image::{GrayImage, RgbImage};

use crate::detection::{LayoutScan, TrainScan};

/// Supplies captured game frames
pub trait FrameSource {
    /// Blocks until a frame is available
    fn capture(&mut self) -> anyhow::Result<RgbImage>;
}

/// Turns frames into marker records
pub trait Detector {
    /// Stations and gates on the calibration frame
    fn detect_layout(&self, frame: &RgbImage) -> anyhow::Result<LayoutScan>;

    /// Trains and the station count on a play frame
    fn detect_trains(&self, frame: &RgbImage) -> anyhow::Result<TrainScan>;
}

/// Decides whether a binarised crop around a gate contains a straight track
pub trait LineProbe {
    fn has_line(&self, crop: &GrayImage) -> anyhow::Result<bool>;
}

/// Performs a click at a real screen position
pub trait Actuator {
    fn click(&mut self, x: f64, y: f64) -> anyhow::Result<()>;
}
