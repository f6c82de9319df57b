use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notice::StatusNotice;

use super::config::Decision;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MissionStatus {
    Idle,
    Capturing,
    Analyzing,
    Approved,
    Failed,
    Completed,
}

impl Default for MissionStatus {
    fn default() -> Self {
        MissionStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Approved,
    Failed,
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// The classifier ran; confidence stayed below the threshold.
    NotRecognized,
    /// No decision within the analysis timeout.
    TimedOut,
    /// Preprocessing or inference failed on this capture.
    ProcessingError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionAttempt {
    pub attempt_number: u32,
    pub confidence: f64,
    pub confidence_percent: u8,
    pub outcome: Outcome,
    pub failure: Option<FailureKind>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("model is not loaded yet")]
    ModelUnavailable,
    #[error("cannot {action} while {from:?}")]
    Illegal {
        action: &'static str,
        from: MissionStatus,
    },
    #[error("result for attempt {attempt} arrived after the mission moved on")]
    StaleAttempt { attempt: u32 },
    #[error("mission was left")]
    Abandoned,
}

/// State of one mission screen. Every legal move is a method; anything else
/// returns [`TransitionError::Illegal`] and leaves the state untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionState {
    pub status: MissionStatus,
    /// Number of the latest capture, 0 before the first one.
    pub attempt_number: u32,
    pub attempts: Vec<MissionAttempt>,
    pub last_failure: Option<FailureKind>,
}

impl MissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle → Capturing, only with a loaded model.
    pub fn start(&mut self, model_ready: bool) -> Result<(), TransitionError> {
        self.require(MissionStatus::Idle, "start")?;
        if !model_ready {
            return Err(TransitionError::ModelUnavailable);
        }
        self.status = MissionStatus::Capturing;
        Ok(())
    }

    /// Capturing → Analyzing. Returns the new attempt number.
    pub fn begin_analysis(&mut self) -> Result<u32, TransitionError> {
        self.require(MissionStatus::Capturing, "analyze a capture")?;
        self.attempt_number += 1;
        self.status = MissionStatus::Analyzing;
        Ok(self.attempt_number)
    }

    /// Analyzing → Approved | Failed from a classifier decision.
    pub fn record_decision(&mut self, attempt: u32, decision: Decision) -> Result<&MissionAttempt, TransitionError> {
        let failure = match decision.outcome {
            Outcome::Approved => None,
            Outcome::Failed => Some(FailureKind::NotRecognized),
        };
        self.finish(attempt, decision.confidence, decision.confidence_percent, decision.outcome, failure)
    }

    /// Analyzing → Failed with confidence 0.
    pub fn record_failure(&mut self, attempt: u32, kind: FailureKind) -> Result<&MissionAttempt, TransitionError> {
        self.finish(attempt, 0.0, 0, Outcome::Failed, Some(kind))
    }

    /// Failed → Capturing. The attempt log is kept.
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        self.require(MissionStatus::Failed, "retry")?;
        self.status = MissionStatus::Capturing;
        Ok(())
    }

    /// Approved → Capturing, to scan again.
    pub fn rescan(&mut self) -> Result<(), TransitionError> {
        self.require(MissionStatus::Approved, "rescan")?;
        self.status = MissionStatus::Capturing;
        Ok(())
    }

    /// Approved → Completed. Terminal.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.require(MissionStatus::Approved, "complete")?;
        self.status = MissionStatus::Completed;
        Ok(())
    }

    pub fn last_attempt(&self) -> Option<&MissionAttempt> {
        self.attempts.last()
    }

    pub fn notice(&self, model_ready: bool) -> Option<StatusNotice> {
        match self.status {
            MissionStatus::Idle if !model_ready => Some(StatusNotice::AiLoading),
            MissionStatus::Failed => match self.last_failure {
                Some(FailureKind::NotRecognized) => Some(StatusNotice::NotRecognized),
                Some(FailureKind::TimedOut | FailureKind::ProcessingError) | None => Some(StatusNotice::TryAgain),
            },
            MissionStatus::Completed => Some(StatusNotice::MissionComplete),
            _ => None,
        }
    }

    fn finish(
        &mut self,
        attempt: u32,
        confidence: f64,
        confidence_percent: u8,
        outcome: Outcome,
        failure: Option<FailureKind>,
    ) -> Result<&MissionAttempt, TransitionError> {
        if self.status != MissionStatus::Analyzing || attempt != self.attempt_number {
            return Err(TransitionError::StaleAttempt { attempt });
        }

        self.status = match outcome {
            Outcome::Approved => MissionStatus::Approved,
            Outcome::Failed => MissionStatus::Failed,
        };
        self.last_failure = failure;
        self.attempts.push(MissionAttempt {
            attempt_number: attempt,
            confidence,
            confidence_percent,
            outcome,
            failure,
            recorded_at: Utc::now(),
        });

        match self.attempts.last() {
            Some(recorded) => Ok(recorded),
            None => Err(TransitionError::StaleAttempt { attempt }),
        }
    }

    fn require(&self, status: MissionStatus, action: &'static str) -> Result<(), TransitionError> {
        if self.status == status {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                action,
                from: self.status,
            })
        }
    }
}
