//! High-level detection module

pub mod config;
pub mod detector;

pub use config::{CircleConfig, DetectionConfig, LineConfig};
pub use detector::MarkerDetector;
