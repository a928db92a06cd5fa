//! The lifecycle service: all mutable engine state in one owner.
//!
//! [`LifecycleService`] holds the event store, the beam collection, the
//! aggregator and the running counters. It is owned by a single task (see
//! [`run_lifecycle`](crate::runner::run_lifecycle)) and every method runs
//! to completion without suspending, so no lock ever guards it.

use geopulse_types::{AggregateReport, EmphasisBeam, LifecycleStats, SceneFrame, Timestamp};
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::config::{GeoPulseConfig, LifecycleConfig};
use crate::fade::FadeScheduler;
use crate::geo;
use crate::ingest::{NormalizedBatch, PollError};
use crate::store::{BeamStore, EventStore};

/// Widen a collection size to a counter value.
fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Owner of the event store, beams, aggregator and counters.
#[derive(Debug, Clone)]
pub struct LifecycleService {
    events: EventStore,
    beams: BeamStore,
    aggregator: Aggregator,
    fader: FadeScheduler,
    point_radius: f64,
    beam_length: f64,
    stats: LifecycleStats,
}

impl LifecycleService {
    /// Create an empty service.
    pub fn new(lifecycle: &LifecycleConfig, aggregator: Aggregator) -> Self {
        Self {
            events: EventStore::new(),
            beams: BeamStore::new(),
            aggregator,
            fader: FadeScheduler::new(lifecycle.ttl_ms, lifecycle.point_radius),
            point_radius: lifecycle.point_radius,
            beam_length: lifecycle.beam_length,
            stats: LifecycleStats::default(),
        }
    }

    /// Create an empty service from the full configuration.
    pub fn from_config(config: &GeoPulseConfig) -> Self {
        Self::new(
            &config.lifecycle,
            Aggregator::from_config(&config.aggregation, &config.chart),
        )
    }

    /// Accept a normalized batch.
    ///
    /// Every event goes to the store and the aggregator; flagged events
    /// also get an emphasis beam standing on their surface point. Returns
    /// the number of events accepted.
    pub fn ingest(&mut self, batch: NormalizedBatch) -> usize {
        for rejection in &batch.rejected {
            warn!(
                batch_id = %batch.batch_id,
                index = rejection.index,
                reason = %rejection.reason,
                "Record rejected"
            );
        }

        let accepted = batch.events.len();
        let flagged = batch.events.iter().filter(|e| e.flagged).count();

        for event in batch.events {
            self.aggregator.record(&event);
            if event.flagged {
                self.beams.insert(EmphasisBeam {
                    event_id: event.id,
                    anchor: geo::project(event.latitude, event.longitude, self.point_radius),
                    direction: geo::surface_normal(event.latitude, event.longitude),
                    length: self.beam_length,
                    created_at: event.created_at,
                });
            }
            self.events.insert(event);
        }

        self.stats.polls_succeeded = self.stats.polls_succeeded.saturating_add(1);
        self.stats.events_ingested = self.stats.events_ingested.saturating_add(as_count(accepted));
        self.stats.records_rejected = self
            .stats
            .records_rejected
            .saturating_add(as_count(batch.rejected.len()));

        info!(
            batch_id = %batch.batch_id,
            accepted,
            flagged,
            rejected = batch.rejected.len(),
            live_events = self.events.len(),
            "Batch ingested"
        );
        accepted
    }

    /// Count a failed poll. State is otherwise untouched.
    pub fn record_poll_failure(&mut self, error: &PollError) {
        self.stats.polls_failed = self.stats.polls_failed.saturating_add(1);
        warn!(error = %error, polls_failed = self.stats.polls_failed, "Poll failed");
    }

    /// Count a timer tick skipped by the overlap gate.
    pub fn record_skipped(&mut self) {
        self.stats.polls_skipped = self.stats.polls_skipped.saturating_add(1);
        debug!(polls_skipped = self.stats.polls_skipped, "Poll skipped, request in flight");
    }

    /// Evict expired items and describe the survivors for rendering.
    pub fn fade_pass(&mut self, now: Timestamp) -> SceneFrame {
        let pass = self.fader.fade_pass(now, &mut self.events, &mut self.beams);
        self.stats.events_evicted = self
            .stats
            .events_evicted
            .saturating_add(as_count(pass.evicted_events));
        self.stats.beams_evicted = self
            .stats
            .beams_evicted
            .saturating_add(as_count(pass.evicted_beams));
        pass.frame
    }

    /// Evaluate the aggregates at `now`.
    pub fn report(&mut self, now: Timestamp) -> AggregateReport {
        self.aggregator.report(now)
    }

    /// Current counters, including live collection sizes.
    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            live_events: as_count(self.events.len()),
            live_beams: as_count(self.beams.len()),
            ..self.stats
        }
    }

    /// The live events, oldest first.
    pub const fn events(&self) -> &EventStore {
        &self.events
    }

    /// The live beams, oldest first.
    pub const fn beams(&self) -> &BeamStore {
        &self.beams
    }
}
