pub mod catalog;
pub mod selector;

pub use catalog::{AnchorCatalog, CollectError, CollectedAnchor, CollectionProgress, Ineligibility};
pub use selector::{active_target, nearest_distance, visible};
