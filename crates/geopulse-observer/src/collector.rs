//! Package collector queue.
//!
//! Senders submit individual packages to `/api/package`; the engine's poll
//! source drains them in bulk from `/api/get_packages`. The queue is
//! bounded: once full, each new package pushes out the oldest one.
//! Packages that arrive without a country get one from their coordinates
//! (see [`crate::geocode`]) unless the queue was built without it.

use std::collections::VecDeque;

use geopulse_types::records::deserialize_flag;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::geocode::resolve_country;

/// Category assigned to packages whose country cannot be determined.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// A package as submitted by a sender.
///
/// Serializes to a superset of the poll record format, so a drained queue
/// can be handed to the engine as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingPackage {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Suspicious flag, as a boolean or 0/1.
    #[serde(deserialize_with = "deserialize_flag")]
    pub suspicious: bool,
    /// Country name or code. Empty when the sender left it out; filled in
    /// by [`PackageQueue::push`].
    #[serde(default)]
    pub country: String,
    /// Source address, if the sender provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Sender-side Unix timestamp (seconds). Carried along, never used for
    /// event timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Bounded FIFO of submitted packages.
#[derive(Debug)]
pub struct PackageQueue {
    capacity: usize,
    reverse_geocode: bool,
    items: Mutex<VecDeque<IncomingPackage>>,
}

impl PackageQueue {
    /// Create an empty queue holding at most `capacity` packages.
    ///
    /// With `reverse_geocode` off, packages without a country are queued
    /// as [`UNKNOWN_COUNTRY`].
    pub fn new(capacity: usize, reverse_geocode: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            reverse_geocode,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of queued packages.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a package, dropping the oldest one if the queue is full.
    ///
    /// A blank country is resolved from the coordinates, or set to
    /// [`UNKNOWN_COUNTRY`]. Returns `true` if a package was dropped to make
    /// room.
    pub async fn push(&self, mut package: IncomingPackage) -> bool {
        if package.country.trim().is_empty() {
            package.country = if self.reverse_geocode {
                resolve_country(package.latitude, package.longitude).await
            } else {
                UNKNOWN_COUNTRY.to_owned()
            };
        }

        let mut items = self.items.lock().await;
        let dropped = if items.len() >= self.capacity {
            items.pop_front().is_some()
        } else {
            false
        };
        items.push_back(package);
        dropped
    }

    /// Remove and return every queued package, oldest first.
    pub async fn drain(&self) -> Vec<IncomingPackage> {
        self.items.lock().await.drain(..).collect()
    }

    /// Number of queued packages.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}
