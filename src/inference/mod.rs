pub mod cache;
pub mod linear;
pub mod model;

pub use cache::{ArtifactHandle, LoadError, ModelCache, ModelStatus};
pub use linear::LinearClassifier;
pub use model::{infer, ClassConfidences, Classifier, InferError, ModelHandle};
