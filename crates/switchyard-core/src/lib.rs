//! Switchyard routing core
//!
//! Rebuilds the track graph of a train-routing puzzle from detected markers
//! and decides, frame by frame, which gates to switch so every train reaches
//! the station of its color.

pub mod config;
pub mod control;
pub mod detection;
pub mod error;
pub mod graph;
pub mod routing;
pub mod traits;

// Re-export commonly used types
pub use config::{BotConfig, DiscoveryConfig, GridConfig, RoutingConfig, ScreenTransform, SessionConfig};
pub use control::{Actuation, FrameOutcome, GateController, Session, SessionSummary, SkipReason, TrackedTrain};
pub use detection::{LayoutScan, Marker, MarkerKind, TrainScan, TrainSighting};
pub use error::GraphError;
pub use graph::{CellLookup, Color, DirectionResolver, Graph, GridBuilder, Heading, Point, Position};
pub use routing::{DistanceEstimator, PathPlanner, Route};
pub use traits::{Actuator, Detector, FrameSource, LineProbe};
