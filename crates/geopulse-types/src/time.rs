//! Millisecond timestamps.
//!
//! Every temporal quantity in the engine is a [`Timestamp`]: milliseconds
//! since the Unix epoch, taken from a monotonic wall clock. Ages are
//! computed with saturating subtraction so a timestamp that lies in the
//! future never produces a negative age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// A point in time, in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Timestamp(#[ts(type = "number")] u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Create a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds since the epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MILLIS_PER_SECOND))
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The timestamp truncated to whole seconds (the rate bucket key).
    pub fn whole_seconds(self) -> u64 {
        self.0.checked_div(MILLIS_PER_SECOND).unwrap_or(0)
    }

    /// Milliseconds elapsed between `self` and `now`, saturating at zero.
    pub const fn age_at(self, now: Self) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Convert to a UTC date-time, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Convert from a UTC date-time. Instants before the epoch clamp to it.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(u64::try_from(at.timestamp_millis()).unwrap_or(0))
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
