//! Shared application state for the observer server.
//!
//! [`AppState`] holds the broadcast channel for dashboard messages, the
//! latest [`DashboardSnapshot`] that the REST endpoints serve, and the
//! package collector queue. The snapshot is written by the engine's frame
//! sink and only read by handlers.

use std::sync::Arc;

use geopulse_core::config::StyleConfig;
use geopulse_types::{AggregateReport, LifecycleStats, SceneFrame};
use tokio::sync::{RwLock, broadcast};

use crate::collector::PackageQueue;

/// Capacity of the broadcast channel for dashboard messages.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Default capacity of the collector queue.
pub const DEFAULT_COLLECTOR_CAPACITY: usize = 1_000;

/// JSON message pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// A render tick's scene.
    Frame(SceneFrame),
    /// Fresh aggregates after a poll.
    Report {
        /// Top-N and rate series.
        report: AggregateReport,
        /// Lifecycle counters.
        stats: LifecycleStats,
    },
}

/// Latest engine output served by the REST endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// Most recent scene frame.
    pub frame: SceneFrame,
    /// Most recent aggregate report.
    pub report: AggregateReport,
    /// Most recent counters.
    pub stats: LifecycleStats,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for dashboard messages.
    pub tx: broadcast::Sender<DashboardMessage>,
    /// The latest engine output.
    pub snapshot: Arc<RwLock<DashboardSnapshot>>,
    /// Packages waiting to be polled.
    pub packages: Arc<PackageQueue>,
    /// Renderer colors, passed through untouched.
    pub style: StyleConfig,
}

impl AppState {
    /// Create a state with an empty snapshot and a collector queue of
    /// `collector_capacity` packages, reverse geocoding country-less
    /// packages when `reverse_geocode` is set.
    pub fn new(collector_capacity: usize, reverse_geocode: bool, style: StyleConfig) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(DashboardSnapshot::default())),
            packages: Arc::new(PackageQueue::new(collector_capacity, reverse_geocode)),
            style,
        }
    }

    /// Subscribe to the dashboard broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardMessage> {
        self.tx.subscribe()
    }

    /// Publish a message to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, message: DashboardMessage) -> usize {
        // send returns Err only when there are zero receivers,
        // which is normal when no WebSocket clients are connected.
        self.tx.send(message).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTOR_CAPACITY, true, StyleConfig::default())
    }
}
