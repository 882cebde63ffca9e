//! Detection configuration

use serde::{Deserialize, Serialize};

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Gray level above which a pixel belongs to a marker blob
    pub binary_threshold: f64,
    /// Blobs below this fraction of the frame area are noise
    pub noise_fraction: f64,
    /// Blobs below this fraction are trains, larger ones stations
    pub train_fraction: f64,
    /// Train crop half-size is frame width divided by this
    pub train_padding_divisor: u32,
    /// Station crop half-size is frame width divided by this
    pub station_padding_divisor: u32,
    /// Canny thresholds applied to white train crops
    pub canny: (f64, f64),
    /// Segments that mark a white "train" as a piece of track
    pub train_lines: LineConfig,
    /// Segments that reveal a straight track through a gate
    pub track_lines: LineConfig,
    pub gates: CircleConfig,
}

/// Probabilistic Hough segment parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    pub threshold: i32,
    pub min_length: f64,
    pub max_gap: f64,
}

/// Gate detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleConfig {
    pub blur: i32,
    pub dp: f64,
    pub min_distance: f64,
    pub param1: f64,
    pub param2: f64,
    pub radius_range: (i32, i32), // (min_radius, max_radius)
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 180.0,
            noise_fraction: 0.001,
            train_fraction: 0.005,
            train_padding_divisor: 20,
            station_padding_divisor: 15,
            canny: (50.0, 150.0),
            train_lines: LineConfig {
                threshold: 40,
                min_length: 30.0,
                max_gap: 0.0,
            },
            track_lines: LineConfig {
                threshold: 60,
                min_length: 50.0,
                max_gap: 0.0,
            },
            gates: CircleConfig::default(),
        }
    }
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            blur: 3,
            dp: 1.0,
            min_distance: 50.0,
            param1: 50.0,
            param2: 40.0,
            radius_range: (22, 35),
        }
    }
}
