use serde::Serialize;

use crate::visibility::CollectError;

/// The only engine states the rest of the app has to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusNotice {
    /// "Too far" / "not aligned" when collecting an anchor.
    TooFar,
    /// The classifier ran and the product was not recognized.
    NotRecognized,
    /// The attempt produced no usable result (timeout, bad capture); recapture.
    TryAgain,
    /// The model is not loaded yet.
    AiLoading,
    MissionComplete,
}

impl StatusNotice {
    pub fn message(&self) -> &'static str {
        match self {
            StatusNotice::TooFar => "Too far! Get closer and face the object to collect it",
            StatusNotice::NotRecognized => "Not recognized, try again",
            StatusNotice::TryAgain => "Could not analyze the photo, try again",
            StatusNotice::AiLoading => "AI loading...",
            StatusNotice::MissionComplete => "Mission complete!",
        }
    }
}

impl From<&CollectError> for StatusNotice {
    fn from(err: &CollectError) -> Self {
        match err {
            CollectError::NotEligible { .. } => StatusNotice::TooFar,
        }
    }
}
