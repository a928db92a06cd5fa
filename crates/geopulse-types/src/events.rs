//! Ingested events and their emphasis beams.
//!
//! An [`Event`] is created once per valid [`RawRecord`](crate::RawRecord)
//! and stamped with the engine clock. A flagged event additionally gets an
//! [`EmphasisBeam`]: a short marker standing on the event's surface point,
//! pointing outward. Beams share the event TTL but are tracked in their own
//! collection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::Position3D;
use crate::ids::EventId;
use crate::time::Timestamp;

/// One ingested package occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Identifier assigned at normalization (not used for deduplication).
    pub id: EventId,
    /// Latitude in degrees, validated to [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, validated to [-180, 180].
    pub longitude: f64,
    /// Category label used for the top-N aggregation.
    pub category: String,
    /// Whether the event belongs to the emphasized subset.
    pub flagged: bool,
    /// Engine clock reading at normalization.
    pub created_at: Timestamp,
}

/// The secondary marker tied to a flagged event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmphasisBeam {
    /// The flagged event this beam belongs to.
    pub event_id: EventId,
    /// Surface point the beam stands on.
    pub anchor: Position3D,
    /// Outward radial unit vector at the anchor.
    pub direction: Position3D,
    /// Beam length in globe units.
    pub length: f64,
    /// Creation time (same as the owning event).
    pub created_at: Timestamp,
}
