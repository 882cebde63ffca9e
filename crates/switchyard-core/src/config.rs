//! Tunables for calibration, routing and the session loop

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub grid: GridConfig,
    pub discovery: DiscoveryConfig,
    pub routing: RoutingConfig,
    pub screen: ScreenTransform,
    pub session: SessionConfig,
}

/// Grid calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Margin added around the marker bounding box, in pixels
    pub padding: i32,
}

/// Gate classification heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Half-width of the square crop around a gate
    pub crop_radius: u32,
    /// Gray level separating track from background
    pub track_threshold: u8,
    /// Width of the band summed along each crop edge
    pub edge_band: u32,
}

/// Path search and progress estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub max_depth: usize,
    /// Progress fraction past which a train's own node is dropped from its route
    pub trim_fraction: f64,
    /// Pixel bias applied along the travel direction
    pub marker_bias: f64,
    /// Pixels per hop
    pub distance_scale: f64,
}

/// Maps frame pixels to real screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale: f64,
}

/// Frame loop limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub duration_secs: u64,
    pub max_frames: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { padding: 15 }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            crop_radius: 45,
            track_threshold: 50,
            edge_band: 20,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            trim_fraction: 0.4,
            marker_bias: 30.0,
            distance_scale: 100.0,
        }
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ScreenTransform {
    pub fn apply(&self, x: i32, y: i32) -> (f64, f64) {
        (
            x as f64 * self.scale + self.origin_x,
            y as f64 * self.scale + self.origin_y,
        )
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 160,
            max_frames: None,
        }
    }
}

impl SessionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}
