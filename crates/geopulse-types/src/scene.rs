//! Outbound descriptors handed to the renderer, chart and summary panel.
//!
//! These are plain data: the engine produces them, collaborators (the
//! observer dashboard, a 3D front-end) consume them. Every collection is a
//! full replacement of the previous one, never a diff.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::Position3D;
use crate::ids::EventId;
use crate::time::Timestamp;

/// Render state of one live event for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PointDescriptor {
    /// The event being drawn.
    pub id: EventId,
    /// Marker position on (slightly above) the globe surface.
    pub position: Position3D,
    /// Remaining visual intensity in [0, 1].
    pub liveness: f64,
    /// Whether to draw with the emphasized style.
    pub flagged: bool,
}

/// Render state of one live emphasis beam for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BeamDescriptor {
    /// The flagged event the beam belongs to.
    pub event_id: EventId,
    /// Surface point the beam stands on.
    pub anchor: Position3D,
    /// Outward unit direction.
    pub direction: Position3D,
    /// Beam length in globe units.
    pub length: f64,
    /// Midpoint of the beam, where a centered mesh is placed.
    pub center: Position3D,
    /// Remaining visual intensity in [0, 1].
    pub liveness: f64,
}

/// Everything the renderer needs for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SceneFrame {
    /// Clock reading the liveness values were computed for.
    pub at: Timestamp,
    /// One entry per live event, oldest first.
    pub points: Vec<PointDescriptor>,
    /// One entry per live beam, oldest first.
    pub beams: Vec<BeamDescriptor>,
}

/// One row of the top-N summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Number of events in the window.
    pub count: u32,
}

/// One one-second bucket of the rate series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RateBucket {
    /// Whole seconds since the epoch.
    #[ts(type = "number")]
    pub second: u64,
    /// Events recorded during that second.
    pub count: u32,
}

/// One point of the chart series, ready for a charting library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChartPoint {
    /// Displayable time of the bucket.
    pub label: String,
    /// Events during that second.
    pub value: u32,
}

/// Aggregates recomputed after every poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AggregateReport {
    /// Clock reading the windows were evaluated at.
    pub at: Timestamp,
    /// Top categories by descending count.
    pub top_categories: Vec<CategoryCount>,
    /// Non-empty rate buckets in ascending time order.
    pub rate: Vec<RateBucket>,
    /// The rate series labelled for charting.
    pub chart: Vec<ChartPoint>,
}

/// Running counters of the lifecycle engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LifecycleStats {
    /// Poll batches received successfully.
    #[ts(type = "number")]
    pub polls_succeeded: u64,
    /// Polls that failed (transport, status, malformed payload).
    #[ts(type = "number")]
    pub polls_failed: u64,
    /// Timer ticks skipped because a poll was still in flight.
    #[ts(type = "number")]
    pub polls_skipped: u64,
    /// Events accepted into the store.
    #[ts(type = "number")]
    pub events_ingested: u64,
    /// Records rejected by per-record validation.
    #[ts(type = "number")]
    pub records_rejected: u64,
    /// Events removed by the fade scheduler.
    #[ts(type = "number")]
    pub events_evicted: u64,
    /// Beams removed by the fade scheduler.
    #[ts(type = "number")]
    pub beams_evicted: u64,
    /// Events currently alive.
    #[ts(type = "number")]
    pub live_events: u64,
    /// Beams currently alive.
    #[ts(type = "number")]
    pub live_beams: u64,
}
