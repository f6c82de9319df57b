use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::geo::GeoPoint;
use crate::settings::EngineSettings;

use super::{AnchorObject, HeadingSample, ObjectProjection, TrackerState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy)]
enum SensorSample {
    Location(GeoPoint),
    Heading(HeadingSample),
}

/// Cloneable entry point for the location service. Safe to move into sensor
/// callbacks on any thread; every sample is serialized through the tracker task.
#[derive(Debug, Clone)]
pub struct SensorFeed {
    tx: mpsc::UnboundedSender<SensorSample>,
}

impl SensorFeed {
    /// Returns false once the tracker has shut down.
    pub fn on_location_sample(&self, position: GeoPoint) -> bool {
        self.tx.send(SensorSample::Location(position)).is_ok()
    }

    pub fn on_heading_sample(&self, heading: HeadingSample) -> bool {
        self.tx.send(SensorSample::Heading(heading)).is_ok()
    }
}

/// Owns the single writer of [`TrackerState`].
///
/// Position and heading samples arrive through a channel and are applied in
/// order by one task. Readers get the last settled state from a `watch`
/// channel, so [`ProximityTracker::project`] never waits on a sensor write.
pub struct ProximityTracker {
    feed: SensorFeed,
    state_rx: watch::Receiver<TrackerState>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    facing_threshold_degrees: f64,
}

impl ProximityTracker {
    /// Must be called from within a tokio runtime.
    pub fn spawn(settings: &EngineSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TrackerState::new());
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(tracker_loop(
            rx,
            state_tx,
            settings.heading_debounce_degrees,
            cancel_token.clone(),
        ));

        Self {
            feed: SensorFeed { tx },
            state_rx,
            cancel_token,
            handle: Some(handle),
            facing_threshold_degrees: settings.facing_threshold_degrees,
        }
    }

    pub fn sensor_feed(&self) -> SensorFeed {
        self.feed.clone()
    }

    pub fn on_location_sample(&self, position: GeoPoint) -> bool {
        self.feed.on_location_sample(position)
    }

    pub fn on_heading_sample(&self, heading: HeadingSample) -> bool {
        self.feed.on_heading_sample(heading)
    }

    pub fn snapshot(&self) -> TrackerState {
        *self.state_rx.borrow()
    }

    /// Notified whenever a sample changes the settled state.
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state_rx.clone()
    }

    pub fn project(&self, objects: &[AnchorObject]) -> Vec<ObjectProjection> {
        self.snapshot()
            .project(objects, self.facing_threshold_degrees)
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("tracker task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for ProximityTracker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn tracker_loop(
    mut samples: mpsc::UnboundedReceiver<SensorSample>,
    state_tx: watch::Sender<TrackerState>,
    debounce_degrees: f64,
    cancel_token: CancellationToken,
) {
    let mut state = TrackerState::new();

    loop {
        tokio::select! {
            sample = samples.recv() => {
                let Some(sample) = sample else {
                    log_info!("sensor feed closed, tracker stopping");
                    break;
                };

                let changed = match sample {
                    SensorSample::Location(position) => {
                        state.apply_location(position);
                        true
                    }
                    SensorSample::Heading(heading) => {
                        let accepted = state.apply_heading(heading, debounce_degrees);
                        if !accepted {
                            log_debug!("heading {:.1} within debounce, dropped", heading.degrees());
                        }
                        accepted
                    }
                };

                if changed {
                    state_tx.send_replace(state);
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("tracker shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn origin() -> GeoPoint {
        GeoPoint::new(14.8133, 121.03685)
    }

    #[tokio::test]
    async fn samples_settle_into_snapshot() {
        let mut tracker = ProximityTracker::spawn(&EngineSettings::default());
        let mut rx = tracker.subscribe();

        tracker.on_location_sample(origin());
        tracker.on_heading_sample(HeadingSample::new(90.0).unwrap());

        tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.has_fix() && s.heading.is_some()),
        )
        .await
        .expect("tracker did not settle")
        .unwrap();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.position, Some(origin()));
        assert_eq!(snapshot.heading, Some(90.0));

        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn feeds_from_other_threads_are_serialized() {
        let mut tracker = ProximityTracker::spawn(&EngineSettings::default());
        let mut rx = tracker.subscribe();
        let feed = tracker.sensor_feed();

        let worker = std::thread::spawn(move || {
            for i in 0..50 {
                feed.on_location_sample(GeoPoint::new(14.0 + i as f64 * 1e-5, 121.0));
            }
        });
        worker.join().unwrap();

        let last = GeoPoint::new(14.0 + 49.0 * 1e-5, 121.0);
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|s| s.position == Some(last)))
            .await
            .expect("tracker did not settle")
            .unwrap();

        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn project_before_any_fix_is_empty() {
        let mut tracker = ProximityTracker::spawn(&EngineSettings::default());
        let anchors = vec![AnchorObject::new(1, "A", origin(), 10.0)];
        assert!(tracker.project(&anchors).is_empty());
        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn feed_reports_shutdown() {
        let mut tracker = ProximityTracker::spawn(&EngineSettings::default());
        let feed = tracker.sensor_feed();
        tracker.shutdown().await.unwrap();
        drop(tracker);
        assert!(!feed.on_location_sample(origin()));
    }
}
