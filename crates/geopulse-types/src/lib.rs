//! Shared type definitions for the `GeoPulse` event globe.
//!
//! This crate is the single source of truth for the data that crosses crate
//! boundaries: the inbound wire record, ingested events, and the outbound
//! descriptors consumed by the renderer, the chart and the summary panel.
//! Types flow downstream to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`time`] -- Millisecond [`Timestamp`]
//! - [`geometry`] -- [`Position3D`] in globe space
//! - [`records`] -- Inbound [`RawRecord`] wire format
//! - [`events`] -- [`Event`] and [`EmphasisBeam`]
//! - [`scene`] -- Outbound frame, chart and summary descriptors

pub mod events;
pub mod geometry;
pub mod ids;
pub mod records;
pub mod scene;
pub mod time;

// Re-export all public types at crate root for convenience.
pub use events::{EmphasisBeam, Event};
pub use geometry::Position3D;
pub use ids::{BatchId, EventId};
pub use records::RawRecord;
pub use scene::{
    AggregateReport, BeamDescriptor, CategoryCount, ChartPoint, LifecycleStats, PointDescriptor,
    RateBucket, SceneFrame,
};
pub use time::{MILLIS_PER_SECOND, Timestamp};
