use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::inference::{ClassConfidences, InferError};

use super::Outcome;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

/// What one mission type looks for. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionConfig {
    pub id: String,
    pub title: String,
    pub product_label: String,
    /// Classifier output that means "this is the product".
    pub class_index_for_match: usize,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub hint: String,
}

/// Result of comparing one inference against a mission's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub confidence: f64,
    /// Rounded for display only.
    pub confidence_percent: u8,
    pub outcome: Outcome,
}

impl MissionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("mission id must not be empty"));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(anyhow!(
                "mission '{}' has confidenceThreshold {} outside (0, 1]",
                self.id,
                self.confidence_threshold
            ));
        }
        Ok(())
    }

    /// Approve when the matched class reaches the threshold. The comparison
    /// uses the raw confidence, never the rounded percentage.
    pub fn evaluate(&self, confidences: &ClassConfidences) -> Result<Decision, InferError> {
        let confidence = confidences.get(self.class_index_for_match)?;
        let outcome = if confidence >= self.confidence_threshold {
            Outcome::Approved
        } else {
            Outcome::Failed
        };
        Ok(Decision {
            confidence,
            confidence_percent: to_percent(confidence),
            outcome,
        })
    }
}

pub fn to_percent(confidence: f64) -> u8 {
    (confidence * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Mission configs keyed by mission id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionCatalog {
    missions: BTreeMap<String, MissionConfig>,
}

impl MissionCatalog {
    pub fn new(configs: Vec<MissionConfig>) -> Result<Self> {
        let mut missions = BTreeMap::new();
        for config in configs {
            config.validate()?;
            if missions.contains_key(&config.id) {
                return Err(anyhow!("duplicate mission id '{}'", config.id));
            }
            missions.insert(config.id.clone(), config);
        }
        Ok(Self { missions })
    }

    /// Missions shipped with the app. The bundled classifier orders its
    /// classes as `[c2, other, gatorade, coca_cola]`.
    pub fn builtin() -> Self {
        let configs = vec![
            MissionConfig {
                id: "c2".into(),
                title: "C2 Green Tea Mission".into(),
                product_label: "C2 Apple Green Tea".into(),
                class_index_for_match: 0,
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                hint: "Buy a C2 Apple Green Tea!".into(),
            },
            MissionConfig {
                id: "gatorade".into(),
                title: "Gatorade Mission".into(),
                product_label: "Gatorade".into(),
                class_index_for_match: 2,
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                hint: "Any Gatorade flavor counts, make sure the logo is clearly visible.".into(),
            },
            MissionConfig {
                id: "cocacola".into(),
                title: "Coca-Cola Mission".into(),
                product_label: "Coca-Cola".into(),
                class_index_for_match: 3,
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                hint: "Any Coca-Cola variant counts (Classic, Zero, Light), make sure the red label is clearly visible.".into(),
            },
        ];

        Self {
            missions: configs.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// Reads a JSON array of mission configs.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read missions from {}", path.display()))?;
        let configs: Vec<MissionConfig> = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed mission catalog {}", path.display()))?;
        Self::new(configs)
    }

    pub fn get(&self, id: &str) -> Option<&MissionConfig> {
        self.missions.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.missions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }
}
