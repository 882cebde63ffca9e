//! Switchyard Computer Vision Library
//!
//! Finds stations, trains and gates in game frames using OpenCV, and
//! provides the line probe used while resolving gate directions.

pub mod color;
pub mod detection;
pub mod lines;
pub mod utils;

// Re-export commonly used types
pub use detection::{CircleConfig, DetectionConfig, LineConfig, MarkerDetector};
pub use lines::HoughLineProbe;
pub use utils::ImageUtils;

// Error handling
pub type Result<T> = anyhow::Result<T>;
