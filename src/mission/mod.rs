pub mod config;
pub mod controller;
pub mod state;

pub use config::{Decision, MissionCatalog, MissionConfig, DEFAULT_CONFIDENCE_THRESHOLD};
pub use controller::{MissionController, MissionEvent, MissionSnapshot};
pub use state::{FailureKind, MissionAttempt, MissionState, MissionStatus, Outcome, TransitionError};
