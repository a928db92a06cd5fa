//! Engine clock.
//!
//! The clock is the single source of truth for time in the engine. Every
//! event is stamped with [`Clock::now`] at normalization and every fade and
//! aggregation pass reads the same clock, so ages are always computed
//! against one timeline.
//!
//! # Design Principles
//!
//! - Readings never go backwards. [`MonotonicClock`] clamps the wall clock
//!   to the highest value it has handed out, which keeps the append order
//!   of the event store equal to creation order even if the system clock
//!   is stepped back.
//! - Tests drive time explicitly through [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use geopulse_types::Timestamp;

/// A source of timestamps.
pub trait Clock: Send + Sync {
    /// Current time. Successive calls never return a smaller value.
    fn now(&self) -> Timestamp;
}

/// Wall clock (UTC milliseconds) that never goes backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    /// Highest reading handed out so far.
    last: AtomicU64,
}

impl MonotonicClock {
    /// Create a new monotonic wall clock.
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::from_datetime(Utc::now()).as_millis();
        let previous = self.last.fetch_max(wall, Ordering::AcqRel);
        Timestamp::from_millis(previous.max(wall))
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current reading in milliseconds.
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock reading `start`.
    pub const fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Move the clock forward by `millis`. Returns the new reading.
    pub fn advance(&self, millis: u64) -> Timestamp {
        let mut current = self.millis.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(millis);
            match self.millis.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Timestamp::from_millis(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Jump to `at`. Readings earlier than the current one are ignored so
    /// the clock stays monotonic.
    pub fn set(&self, at: Timestamp) {
        self.millis.fetch_max(at.as_millis(), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::Acquire))
    }
}
