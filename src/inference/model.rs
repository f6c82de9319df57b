use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::vision::{InputTensor, TENSOR_LEN};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferError {
    #[error("input tensor has {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("model produced {actual} confidences for {expected} classes")]
    ClassCountMismatch { expected: usize, actual: usize },
    #[error("class index {index} out of range for {classes} classes")]
    MissingClass { index: usize, classes: usize },
    #[error("inference runtime fault: {0}")]
    RuntimeFault(String),
}

/// A loaded classifier. Implementations must be usable from several threads
/// at once without locking.
pub trait Classifier: Send + Sync {
    /// One label per output class, in output order.
    fn labels(&self) -> &[String];

    /// Raw per-class scores for one tensor.
    fn classify(&self, tensor: &InputTensor) -> Result<Vec<f64>, InferError>;
}

pub type ModelHandle = Arc<dyn Classifier>;

/// One confidence per class, aligned with `labels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfidences {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ClassConfidences {
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> Self {
        Self { labels, values }
    }

    /// Unlabelled confidences, e.g. supplied by an external runtime.
    pub fn from_values(values: Vec<f64>) -> Self {
        let labels = (0..values.len()).map(|i| format!("class_{i}")).collect();
        Self { labels, values }
    }

    pub fn get(&self, index: usize) -> Result<f64, InferError> {
        self.values
            .get(index)
            .copied()
            .ok_or(InferError::MissingClass {
                index,
                classes: self.values.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index and value of the most confident class.
    pub fn top(&self) -> Option<(usize, f64)> {
        self.values
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Run `model` on `tensor` and check its output contract.
pub fn infer(model: &ModelHandle, tensor: &InputTensor) -> Result<ClassConfidences, InferError> {
    if tensor.len() != TENSOR_LEN {
        return Err(InferError::ShapeMismatch {
            expected: TENSOR_LEN,
            actual: tensor.len(),
        });
    }

    let labels = model.labels();
    let values = model.classify(tensor)?;

    if values.len() != labels.len() {
        return Err(InferError::ClassCountMismatch {
            expected: labels.len(),
            actual: values.len(),
        });
    }

    if let Some((index, value)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(*v))
    {
        return Err(InferError::RuntimeFault(format!(
            "confidence {value} for class {index} is outside [0, 1]"
        )));
    }

    Ok(ClassConfidences::new(labels.to_vec(), values))
}
