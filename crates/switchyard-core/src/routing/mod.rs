pub mod distance;
pub mod path;

pub use distance::DistanceEstimator;
pub use path::{PathPlanner, Route};
