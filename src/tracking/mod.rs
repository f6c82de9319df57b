pub mod anchor;
pub mod state;
pub mod tracker;

pub use anchor::{AnchorId, AnchorObject, HeadingSample, ObjectProjection};
pub use state::TrackerState;
pub use tracker::{ProximityTracker, SensorFeed};
