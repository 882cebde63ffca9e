pub mod controller;
pub mod session;

pub use controller::{Actuation, FrameOutcome, FrameReport, GateController, SkipReason, TrackedTrain};
pub use session::{Session, SessionSummary};
