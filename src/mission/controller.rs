use std::{sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    inference::{infer, ClassConfidences, InferError, ModelCache, ModelHandle},
    notice::StatusNotice,
    settings::EngineSettings,
    vision::{to_tensor, CaptureBuffer, PreprocessError},
};

use super::{FailureKind, MissionAttempt, MissionConfig, MissionState, MissionStatus, TransitionError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Error)]
enum AnalysisError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Infer(#[from] InferError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSnapshot {
    pub session_id: String,
    pub mission_id: String,
    pub product_label: String,
    pub state: MissionState,
    pub last_confidence_percent: Option<u8>,
    pub notice: Option<StatusNotice>,
}

/// Everything the UI layer can bind to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MissionEvent {
    StateChanged { snapshot: MissionSnapshot },
    AttemptRecorded { attempt: MissionAttempt },
    MissionCompleted { session_id: String, mission_id: String, attempts: u32 },
}

/// Drives one mission screen: capture → preprocess → infer → decide.
///
/// Cloning shares the same mission. Preprocessing and inference run on the
/// blocking pool; the caller awaits the decision, the timeout, or `leave()`.
#[derive(Clone)]
pub struct MissionController {
    session_id: String,
    config: Arc<MissionConfig>,
    state: Arc<Mutex<MissionState>>,
    models: &'static ModelCache,
    events: broadcast::Sender<MissionEvent>,
    cancel_token: CancellationToken,
    analysis_timeout: Duration,
}

impl MissionController {
    pub fn new(config: MissionConfig, models: &'static ModelCache, settings: &EngineSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            session_id: Uuid::new_v4().to_string(),
            config: Arc::new(config),
            state: Arc::new(Mutex::new(MissionState::new())),
            models,
            events,
            cancel_token: CancellationToken::new(),
            analysis_timeout: settings.analysis_timeout(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MissionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> MissionSnapshot {
        let guard = self.state.lock().await;
        self.build_snapshot(&guard)
    }

    pub async fn notice(&self) -> Option<StatusNotice> {
        self.state.lock().await.notice(self.models.is_ready())
    }

    pub async fn start(&self) -> Result<MissionSnapshot, TransitionError> {
        self.ensure_active()?;
        {
            let mut state = self.state.lock().await;
            if let Err(err) = state.start(self.models.is_ready()) {
                if err == TransitionError::ModelUnavailable {
                    log_info!("mission {} waiting for model", self.config.id);
                }
                return Err(err);
            }
        }
        log_info!("mission {} started (session {})", self.config.id, self.session_id);
        Ok(self.emit_state_changed().await)
    }

    /// Analyze one capture and decide the attempt.
    ///
    /// Processing failures and timeouts become a `Failed` attempt, not an
    /// error. `Err` means the call itself was not legal, or the mission was
    /// left while the capture was being analyzed.
    pub async fn on_captured(&self, capture: CaptureBuffer) -> Result<MissionAttempt, TransitionError> {
        self.ensure_active()?;
        let model = self.models.get().ok_or(TransitionError::ModelUnavailable)?;

        let attempt = self.state.lock().await.begin_analysis()?;
        self.emit_state_changed().await;
        log_info!(
            "mission {} analyzing attempt {} ({} bytes)",
            self.config.id,
            attempt,
            capture.len()
        );

        let work = tokio::task::spawn_blocking(move || analyze(capture, &model));

        let result = tokio::select! {
            _ = self.cancel_token.cancelled() => {
                // The blocking task is left to finish; its result is dropped.
                log_info!("mission {} left during attempt {}, discarding result", self.config.id, attempt);
                return Err(TransitionError::Abandoned);
            }
            result = tokio::time::timeout(self.analysis_timeout, work) => result,
        };

        match result {
            Ok(Ok(Ok(confidences))) => self.apply_confidences(attempt, confidences).await,
            Ok(Ok(Err(err))) => {
                log_warn!("attempt {} could not be analyzed: {}", attempt, err);
                self.apply_failure(attempt, FailureKind::ProcessingError).await
            }
            Ok(Err(join_err)) => {
                log_error!("analysis worker for attempt {} failed: {}", attempt, join_err);
                self.apply_failure(attempt, FailureKind::ProcessingError).await
            }
            Err(_) => {
                log_warn!(
                    "attempt {} timed out after {}ms",
                    attempt,
                    self.analysis_timeout.as_millis()
                );
                self.apply_failure(attempt, FailureKind::TimedOut).await
            }
        }
    }

    /// Decide the current attempt from confidences produced elsewhere.
    pub async fn on_inferred(&self, confidences: ClassConfidences) -> Result<MissionAttempt, TransitionError> {
        self.ensure_active()?;
        let attempt = {
            let state = self.state.lock().await;
            if state.status != MissionStatus::Analyzing {
                return Err(TransitionError::Illegal {
                    action: "decide an inference",
                    from: state.status,
                });
            }
            state.attempt_number
        };
        self.apply_confidences(attempt, confidences).await
    }

    pub async fn retry(&self) -> Result<MissionSnapshot, TransitionError> {
        self.ensure_active()?;
        self.state.lock().await.retry()?;
        Ok(self.emit_state_changed().await)
    }

    pub async fn rescan(&self) -> Result<MissionSnapshot, TransitionError> {
        self.ensure_active()?;
        self.state.lock().await.rescan()?;
        Ok(self.emit_state_changed().await)
    }

    pub async fn complete(&self) -> Result<MissionSnapshot, TransitionError> {
        self.ensure_active()?;
        let attempts = {
            let mut state = self.state.lock().await;
            state.complete()?;
            state.attempt_number
        };

        log_info!(
            "mission {} complete after {} attempt(s)",
            self.config.id,
            attempts
        );
        let snapshot = self.emit_state_changed().await;
        let _ = self.events.send(MissionEvent::MissionCompleted {
            session_id: self.session_id.clone(),
            mission_id: self.config.id.clone(),
            attempts,
        });
        Ok(snapshot)
    }

    /// The user navigated away. Any in-flight analysis is discarded and no
    /// further transitions are accepted.
    pub fn leave(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    async fn apply_confidences(
        &self,
        attempt: u32,
        confidences: ClassConfidences,
    ) -> Result<MissionAttempt, TransitionError> {
        let decision = match self.config.evaluate(&confidences) {
            Ok(decision) => decision,
            Err(err) => {
                log_warn!("attempt {} produced unusable confidences: {}", attempt, err);
                return self.apply_failure(attempt, FailureKind::ProcessingError).await;
            }
        };

        self.record(attempt, |state| state.record_decision(attempt, decision).cloned())
            .await
    }

    async fn apply_failure(&self, attempt: u32, kind: FailureKind) -> Result<MissionAttempt, TransitionError> {
        self.record(attempt, |state| state.record_failure(attempt, kind).cloned())
            .await
    }

    async fn record<F>(&self, attempt: u32, apply: F) -> Result<MissionAttempt, TransitionError>
    where
        F: FnOnce(&mut MissionState) -> Result<MissionAttempt, TransitionError>,
    {
        let recorded = {
            let mut state = self.state.lock().await;
            // Checked under the lock so a concurrent leave() cannot interleave.
            self.ensure_active()?;
            apply(&mut state)?
        };

        log_info!(
            "mission {} attempt {}: {:?} at {}%",
            self.config.id,
            attempt,
            recorded.outcome,
            recorded.confidence_percent
        );
        let _ = self.events.send(MissionEvent::AttemptRecorded {
            attempt: recorded.clone(),
        });
        self.emit_state_changed().await;
        Ok(recorded)
    }

    fn ensure_active(&self) -> Result<(), TransitionError> {
        if self.cancel_token.is_cancelled() {
            Err(TransitionError::Abandoned)
        } else {
            Ok(())
        }
    }

    async fn emit_state_changed(&self) -> MissionSnapshot {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(MissionEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    fn build_snapshot(&self, state: &MissionState) -> MissionSnapshot {
        MissionSnapshot {
            session_id: self.session_id.clone(),
            mission_id: self.config.id.clone(),
            product_label: self.config.product_label.clone(),
            last_confidence_percent: state.last_attempt().map(|a| a.confidence_percent),
            notice: state.notice(self.models.is_ready()),
            state: state.clone(),
        }
    }
}

fn analyze(capture: CaptureBuffer, model: &ModelHandle) -> Result<ClassConfidences, AnalysisError> {
    let tensor = to_tensor(capture)?;
    Ok(infer(model, &tensor)?)
}
