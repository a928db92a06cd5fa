//! Poll payload handling and the poll overlap gate.
//!
//! A poll cycle has three stages:
//!
//! 1. [`parse_batch`] turns the response body into [`RawRecord`]s. Any
//!    structural problem (not an array, missing or mistyped field) rejects
//!    the whole batch as [`PollError::Malformed`].
//! 2. [`normalize_batch`] validates each record's value ranges and stamps
//!    the survivors with the engine clock. A record with out-of-range
//!    coordinates or an empty category is dropped on its own and reported
//!    as a [`RecordRejection`]; the rest of the batch is kept.
//! 3. The resulting [`NormalizedBatch`] is handed to the lifecycle task.
//!
//! [`PollGate`] decides whether a timer tick may start a new request while
//! an earlier one is still outstanding.

use std::future::Future;

use geopulse_types::{BatchId, Event, EventId, RawRecord, Timestamp};
use serde::Deserialize;
use validator::Validate;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a poll cycle produced no batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// The request never produced a response (connection refused, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The source answered with a non-success status.
    #[error("source returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The body is not a well-formed record array.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A single record dropped by range validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {index} rejected: {reason}")]
pub struct RecordRejection {
    /// Position of the record inside its batch.
    pub index: usize,
    /// Validation failure description.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Parse a poll response body into raw records.
pub fn parse_batch(body: &[u8]) -> Result<Vec<RawRecord>, PollError> {
    serde_json::from_slice(body).map_err(|e| PollError::Malformed(e.to_string()))
}

/// Events accepted from one poll, plus the records that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    /// Identifier for correlating log lines.
    pub batch_id: BatchId,
    /// Accepted events in payload order, all stamped with the same time.
    pub events: Vec<Event>,
    /// Records that failed validation.
    pub rejected: Vec<RecordRejection>,
}

impl NormalizedBatch {
    /// Total records the batch was built from.
    pub fn record_count(&self) -> usize {
        self.events.len().saturating_add(self.rejected.len())
    }
}

/// Validate and stamp a batch of raw records.
///
/// Every accepted event gets a fresh [`EventId`] and `created_at = now`.
/// Source-side timestamps are never used.
pub fn normalize_batch(records: Vec<RawRecord>, now: Timestamp) -> NormalizedBatch {
    let mut events = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        if let Err(errors) = record.validate() {
            rejected.push(RecordRejection {
                index,
                reason: errors.to_string(),
            });
            continue;
        }
        events.push(Event {
            id: EventId::new(),
            latitude: record.latitude,
            longitude: record.longitude,
            category: record.country,
            flagged: record.suspicious,
            created_at: now,
        });
    }

    NormalizedBatch {
        batch_id: BatchId::new(),
        events,
        rejected,
    }
}

// ---------------------------------------------------------------------------
// Poll source seam
// ---------------------------------------------------------------------------

/// Something that can be polled for a batch of raw records.
pub trait PollSource: Send + Sync + 'static {
    /// Issue one request and return its records.
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawRecord>, PollError>> + Send;
}

// ---------------------------------------------------------------------------
// Overlap gate
// ---------------------------------------------------------------------------

/// What to do with a timer tick that fires while a request is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop the tick. At most one request is ever in flight.
    #[default]
    Skip,
    /// Dispatch anyway. Requests may overlap without bound.
    Allow,
}

/// Outcome of a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Start a request.
    Dispatch,
    /// Do nothing this tick.
    Skip,
}

/// Request bookkeeping: `Idle` when nothing is outstanding, otherwise
/// `InFlight(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No outstanding request.
    Idle,
    /// This many requests are outstanding (always at least one).
    InFlight(usize),
}

/// State machine guarding poll dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollGate {
    policy: OverlapPolicy,
    state: GateState,
}

impl PollGate {
    /// Create an idle gate.
    pub const fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            state: GateState::Idle,
        }
    }

    /// Current state.
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Number of outstanding requests.
    pub const fn in_flight(&self) -> usize {
        match self.state {
            GateState::Idle => 0,
            GateState::InFlight(n) => n,
        }
    }

    /// Handle a timer tick. On [`GateDecision::Dispatch`] the caller must
    /// start exactly one request and later report it via
    /// [`on_complete`](Self::on_complete).
    pub fn on_timer(&mut self) -> GateDecision {
        match (self.state, self.policy) {
            (GateState::Idle, _) => {
                self.state = GateState::InFlight(1);
                GateDecision::Dispatch
            }
            (GateState::InFlight(_), OverlapPolicy::Skip) => GateDecision::Skip,
            (GateState::InFlight(n), OverlapPolicy::Allow) => {
                self.state = GateState::InFlight(n.saturating_add(1));
                GateDecision::Dispatch
            }
        }
    }

    /// Handle a finished request, successful or not.
    pub fn on_complete(&mut self) {
        self.state = match self.state {
            GateState::Idle | GateState::InFlight(0 | 1) => GateState::Idle,
            GateState::InFlight(n) => GateState::InFlight(n.saturating_sub(1)),
        };
    }
}
