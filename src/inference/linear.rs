use serde::{Deserialize, Serialize};

use crate::vision::{InputTensor, TENSOR_CHANNELS, TENSOR_HEIGHT, TENSOR_WIDTH};

use super::{Classifier, InferError, LoadError};

/// Pre-trained linear-softmax classifier, stored as JSON.
///
/// Features are per-channel means over a `grid × grid` partition of the
/// tensor, laid out cell by cell (row-major) with the channels interleaved.
/// `weights[k]` scores class `k` and must have `grid * grid * 3` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearClassifier {
    pub labels: Vec<String>,
    pub grid: usize,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LinearClassifier {
    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let model: LinearClassifier = serde_json::from_slice(bytes)?;
        model.validate()?;
        Ok(model)
    }

    pub fn feature_len(&self) -> usize {
        self.grid * self.grid * TENSOR_CHANNELS
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.labels.is_empty() {
            return Err(LoadError::Invalid("artifact declares no classes".into()));
        }
        if self.grid == 0 || self.grid > TENSOR_WIDTH.min(TENSOR_HEIGHT) as usize {
            return Err(LoadError::Invalid(format!("grid {} is out of range", self.grid)));
        }
        if self.weights.len() != self.labels.len() || self.bias.len() != self.labels.len() {
            return Err(LoadError::Invalid(format!(
                "{} labels but {} weight rows and {} biases",
                self.labels.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }
        let expected = self.feature_len();
        if let Some((class, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != expected)
        {
            return Err(LoadError::Invalid(format!(
                "weight row {} has {} entries, expected {}",
                class,
                row.len(),
                expected
            )));
        }
        let all_finite = self.weights.iter().flatten().chain(self.bias.iter()).all(|v| v.is_finite());
        if !all_finite {
            return Err(LoadError::Invalid("artifact contains non-finite parameters".into()));
        }
        Ok(())
    }

    fn features(&self, tensor: &InputTensor) -> Vec<f64> {
        let width = TENSOR_WIDTH as usize;
        let height = TENSOR_HEIGHT as usize;
        let mut features = Vec::with_capacity(self.feature_len());

        for cell_y in 0..self.grid {
            let (y0, y1) = (cell_y * height / self.grid, (cell_y + 1) * height / self.grid);
            for cell_x in 0..self.grid {
                let (x0, x1) = (cell_x * width / self.grid, (cell_x + 1) * width / self.grid);
                let mut sums = [0.0f64; TENSOR_CHANNELS];
                for y in y0..y1 {
                    for x in x0..x1 {
                        for (c, sum) in sums.iter_mut().enumerate() {
                            *sum += tensor.at(x, y, c) as f64;
                        }
                    }
                }
                let count = ((y1 - y0) * (x1 - x0)).max(1) as f64;
                features.extend(sums.iter().map(|s| s / count));
            }
        }
        features
    }
}

impl Classifier for LinearClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, tensor: &InputTensor) -> Result<Vec<f64>, InferError> {
        let features = self.features(tensor);
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| bias + row.iter().zip(&features).map(|(w, f)| w * f).sum::<f64>())
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f64]) -> Result<Vec<f64>, InferError> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err(InferError::RuntimeFault("non-finite logits".into()));
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::TENSOR_LEN;

    /// Two classes keyed on the mean red level: "red" wins for red images.
    fn red_detector() -> LinearClassifier {
        LinearClassifier {
            labels: vec!["red".into(), "other".into()],
            grid: 1,
            weights: vec![vec![8.0, -4.0, -4.0], vec![-8.0, 4.0, 4.0]],
            bias: vec![0.0, 0.0],
        }
    }

    fn solid(r: f32, g: f32, b: f32) -> InputTensor {
        let data = (0..TENSOR_LEN)
            .map(|i| match i % 3 {
                0 => r,
                1 => g,
                _ => b,
            })
            .collect();
        InputTensor::from_vec(data).unwrap()
    }

    #[test]
    fn softmax_output_sums_to_one() {
        let out = red_detector().classify(&solid(0.2, -0.1, 0.4)).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn red_image_scores_red() {
        let model = red_detector();
        let red = model.classify(&solid(1.0, -1.0, -1.0)).unwrap();
        let blue = model.classify(&solid(-1.0, -1.0, 1.0)).unwrap();
        assert!(red[0] > 0.99);
        assert!(blue[0] < 0.01);
    }

    #[test]
    fn grid_features_see_layout() {
        let model = LinearClassifier {
            labels: vec!["left-bright".into(), "right-bright".into()],
            grid: 2,
            weights: vec![
                vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0],
                vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            ],
            bias: vec![0.0, 0.0],
        };
        model.validate().unwrap();

        let data = (0..TENSOR_LEN)
            .map(|i| {
                let x = (i / 3) % TENSOR_WIDTH as usize;
                if x < TENSOR_WIDTH as usize / 2 { 1.0 } else { -1.0 }
            })
            .collect();
        let tensor = InputTensor::from_vec(data).unwrap();

        let out = model.classify(&tensor).unwrap();
        assert!(out[0] > out[1]);
    }

    #[test]
    fn json_round_trip_and_validation() {
        let json = serde_json::to_vec(&red_detector()).unwrap();
        assert_eq!(LinearClassifier::from_json(&json).unwrap(), red_detector());

        let mut bad = red_detector();
        bad.weights[1].pop();
        let json = serde_json::to_vec(&bad).unwrap();
        assert!(matches!(LinearClassifier::from_json(&json), Err(LoadError::Invalid(_))));

        assert!(matches!(
            LinearClassifier::from_json(b"{ not json"),
            Err(LoadError::Malformed(_))
        ));
    }
}
