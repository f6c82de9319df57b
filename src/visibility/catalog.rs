use serde::Serialize;
use thiserror::Error;

use crate::tracking::{AnchorId, AnchorObject, ObjectProjection};

use super::active_target;

/// Why a collect request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Ineligibility {
    /// Outside the anchor's collect radius.
    TooFar,
    /// In range but the user is not facing it.
    NotAligned,
    /// In range and faced, but another anchor is the active target.
    NotActiveTarget,
    /// Unknown, already collected, or no location fix yet.
    NotVisible,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    #[error("anchor {anchor_id} is not eligible for collection: {reason:?}")]
    NotEligible {
        anchor_id: AnchorId,
        reason: Ineligibility,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProgress {
    pub collected: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedAnchor {
    pub anchor_id: AnchorId,
    pub name: String,
    pub description: String,
    pub progress: CollectionProgress,
}

/// The anchors of one AR session and their collected flags.
#[derive(Debug, Clone, Default)]
pub struct AnchorCatalog {
    anchors: Vec<AnchorObject>,
}

impl AnchorCatalog {
    pub fn new(anchors: Vec<AnchorObject>) -> Self {
        Self { anchors }
    }

    pub fn anchors(&self) -> &[AnchorObject] {
        &self.anchors
    }

    pub fn get(&self, anchor_id: AnchorId) -> Option<&AnchorObject> {
        self.anchors.iter().find(|a| a.id == anchor_id)
    }

    pub fn remaining(&self) -> Vec<AnchorObject> {
        self.anchors.iter().filter(|a| !a.collected).cloned().collect()
    }

    pub fn progress(&self) -> CollectionProgress {
        CollectionProgress {
            collected: self.anchors.iter().filter(|a| a.collected).count(),
            total: self.anchors.len(),
        }
    }

    pub fn all_collected(&self) -> bool {
        !self.anchors.is_empty() && self.anchors.iter().all(|a| a.collected)
    }

    /// Mark `anchor_id` collected if it is the current active target.
    ///
    /// Any other request leaves the catalog untouched and reports why.
    pub fn collect(
        &mut self,
        anchor_id: AnchorId,
        projections: &[ObjectProjection],
    ) -> Result<CollectedAnchor, CollectError> {
        let refuse = |reason| CollectError::NotEligible { anchor_id, reason };

        let Some(projection) = projections.iter().find(|p| p.anchor_id == anchor_id) else {
            return Err(refuse(Ineligibility::NotVisible));
        };
        if !projection.in_range {
            return Err(refuse(Ineligibility::TooFar));
        }
        if !projection.facing {
            return Err(refuse(Ineligibility::NotAligned));
        }
        if active_target(projections).map(|p| p.anchor_id) != Some(anchor_id) {
            return Err(refuse(Ineligibility::NotActiveTarget));
        }

        let anchor = self
            .anchors
            .iter_mut()
            .find(|a| a.id == anchor_id && !a.collected)
            .ok_or_else(|| refuse(Ineligibility::NotVisible))?;
        anchor.collected = true;

        let (name, description) = (anchor.name.clone(), anchor.description.clone());
        log::info!("collected anchor {} ({})", anchor_id, name);

        Ok(CollectedAnchor {
            anchor_id,
            name,
            description,
            progress: self.progress(),
        })
    }
}
