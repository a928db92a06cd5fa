//! Per-tick fading and eviction.
//!
//! Liveness decays linearly from 1 at creation to 0 at the TTL:
//! `liveness = clamp(1 - age / ttl, 0, 1)`. An item whose liveness has
//! reached 0 is removed in the same pass, so nothing lingers invisibly.
//! Events and beams use the same TTL and formula but are evicted from
//! their own collections.

use geopulse_types::{BeamDescriptor, PointDescriptor, SceneFrame, Timestamp};

use crate::geo;
use crate::store::{BeamStore, EventStore};

/// Remaining visual intensity of an item created at `created_at`.
///
/// Always in [0, 1]. A creation time in the future yields 1, a zero TTL
/// yields 0.
#[allow(clippy::cast_precision_loss)]
pub fn liveness(now: Timestamp, created_at: Timestamp, ttl_ms: u64) -> f64 {
    let age = created_at.age_at(now);
    if ttl_ms == 0 || age >= ttl_ms {
        return 0.0;
    }
    (1.0 - age as f64 / ttl_ms as f64).clamp(0.0, 1.0)
}

/// Outcome of one fade pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FadePass {
    /// Render state of everything still alive.
    pub frame: SceneFrame,
    /// Events removed during this pass.
    pub evicted_events: usize,
    /// Beams removed during this pass.
    pub evicted_beams: usize,
}

/// Computes liveness for live items and evicts dead ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeScheduler {
    ttl_ms: u64,
    point_radius: f64,
}

impl FadeScheduler {
    /// Create a scheduler with the given TTL and marker radius.
    pub const fn new(ttl_ms: u64, point_radius: f64) -> Self {
        Self {
            ttl_ms,
            point_radius,
        }
    }

    /// The TTL in milliseconds.
    pub const fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Run one pass at `now`: evict expired events and beams, then describe
    /// the survivors.
    pub fn fade_pass(&self, now: Timestamp, events: &mut EventStore, beams: &mut BeamStore) -> FadePass {
        let evicted_events = events.evict_expired(now, self.ttl_ms);
        let evicted_beams = beams.evict_expired(now, self.ttl_ms);

        let points = events
            .iter()
            .map(|event| PointDescriptor {
                id: event.id,
                position: geo::project(event.latitude, event.longitude, self.point_radius),
                liveness: liveness(now, event.created_at, self.ttl_ms),
                flagged: event.flagged,
            })
            .collect();

        let beams = beams
            .iter()
            .map(|beam| BeamDescriptor {
                event_id: beam.event_id,
                anchor: beam.anchor,
                direction: beam.direction,
                length: beam.length,
                center: geo::beam_center(beam.anchor, beam.direction, beam.length),
                liveness: liveness(now, beam.created_at, self.ttl_ms),
            })
            .collect();

        FadePass {
            frame: SceneFrame {
                at: now,
                points,
                beams,
            },
            evicted_events,
            evicted_beams,
        }
    }
}
