use serde::{Deserialize, Serialize};

use crate::geo::{normalize_degrees, GeoPoint};

pub type AnchorId = u64;

/// A virtual object pinned to a real-world coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorObject {
    pub id: AnchorId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub position: GeoPoint,
    pub collect_radius_meters: f64,
    /// Set once by a successful collection, never cleared.
    #[serde(default)]
    pub collected: bool,
}

impl AnchorObject {
    pub fn new(id: AnchorId, name: impl Into<String>, position: GeoPoint, collect_radius_meters: f64) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            position,
            collect_radius_meters,
            collected: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Compass reading, clockwise from true north, always in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingSample {
    degrees: f64,
}

impl HeadingSample {
    /// Returns `None` for non-finite readings.
    pub fn new(degrees: f64) -> Option<Self> {
        degrees.is_finite().then(|| Self {
            degrees: normalize_degrees(degrees),
        })
    }

    /// Prefer the true-north heading; compasses report a negative value when
    /// it is unavailable, in which case the magnetic heading is used.
    pub fn from_compass(true_heading: Option<f64>, magnetic_heading: f64) -> Option<Self> {
        match true_heading {
            Some(value) if value.is_finite() && value >= 0.0 => Self::new(value),
            _ => Self::new(magnetic_heading),
        }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }
}

/// Per-tick view of one anchor from the user's current pose. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectProjection {
    pub anchor_id: AnchorId,
    pub distance_meters: f64,
    pub local_x: f64,
    pub local_z: f64,
    pub bearing_degrees: f64,
    pub facing: bool,
    pub in_range: bool,
    pub within_tangent_range: bool,
}
