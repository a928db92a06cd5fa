//! Frame sink that updates the observer API state.
//!
//! Every frame and report replaces the matching part of the in-memory
//! [`DashboardSnapshot`] and is broadcast to connected `WebSocket`
//! clients.
//!
//! [`DashboardSnapshot`]: geopulse_observer::DashboardSnapshot

use std::sync::Arc;

use geopulse_core::runner::FrameSink;
use geopulse_observer::{AppState, DashboardMessage};
use geopulse_types::{AggregateReport, LifecycleStats, SceneFrame};
use tracing::debug;

/// Sink that bridges the lifecycle loop to the observer API.
pub struct ObserverSink {
    state: Arc<AppState>,
}

impl ObserverSink {
    /// Create a sink backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl FrameSink for ObserverSink {
    fn on_frame(&mut self, frame: &SceneFrame) {
        // Skipped while a reader holds the lock; the next frame replaces it.
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            snap.frame.clone_from(frame);
        }
        self.state.broadcast(DashboardMessage::Frame(frame.clone()));
    }

    fn on_report(&mut self, report: &AggregateReport, stats: &LifecycleStats) {
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            snap.report.clone_from(report);
            snap.stats = *stats;
        } else {
            debug!("Snapshot busy, report update deferred to next poll");
        }

        let receivers = self.state.broadcast(DashboardMessage::Report {
            report: report.clone(),
            stats: *stats,
        });
        debug!(
            receivers,
            top = report.top_categories.len(),
            buckets = report.rate.len(),
            "Report broadcast sent"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geopulse_types::{CategoryCount, Timestamp};

    use super::*;

    #[tokio::test]
    async fn report_updates_snapshot_and_broadcasts() {
        let state = Arc::new(AppState::default());
        let mut rx = state.subscribe();
        let mut sink = ObserverSink::new(Arc::clone(&state));

        let report = AggregateReport {
            at: Timestamp::from_millis(1_000),
            top_categories: vec![CategoryCount {
                category: "France".to_owned(),
                count: 2,
            }],
            ..AggregateReport::default()
        };
        let stats = LifecycleStats {
            events_ingested: 2,
            ..LifecycleStats::default()
        };
        sink.on_report(&report, &stats);

        let snap = state.snapshot.read().await;
        assert_eq!(snap.report, report);
        assert_eq!(snap.stats.events_ingested, 2);
        drop(snap);

        assert_eq!(
            rx.recv().await.unwrap(),
            DashboardMessage::Report { report, stats }
        );
    }

    #[tokio::test]
    async fn frame_replaces_snapshot_frame() {
        let state = Arc::new(AppState::default());
        let mut sink = ObserverSink::new(Arc::clone(&state));

        let frame = SceneFrame {
            at: Timestamp::from_millis(42),
            ..SceneFrame::default()
        };
        sink.on_frame(&frame);

        assert_eq!(state.snapshot.read().await.frame.at, Timestamp::from_millis(42));
    }
}
