//! Append-ordered live sets with age-based eviction.
//!
//! [`LiveSet`] backs both the event store and the beam collection. Items
//! are appended in creation order (the engine clock is monotonic and
//! ingestion is append-only), so the oldest item is always at the front and
//! eviction can stop at the first item that is still alive. Eviction costs
//! O(k) for k expired items, never a full scan.
//!
//! Expiry is inclusive: an item whose age equals the TTL is evicted.

use std::collections::VecDeque;

use geopulse_types::{EmphasisBeam, Event, Timestamp};

/// Something with a creation time.
pub trait Aged {
    /// When the item was created.
    fn created_at(&self) -> Timestamp;

    /// Whether the item has reached `ttl_ms` at `now`.
    fn is_expired(&self, now: Timestamp, ttl_ms: u64) -> bool {
        self.created_at().age_at(now) >= ttl_ms
    }
}

impl Aged for Event {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

impl Aged for EmphasisBeam {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Live items in insertion order.
#[derive(Debug, Clone)]
pub struct LiveSet<T> {
    items: VecDeque<T>,
}

/// The live event collection.
pub type EventStore = LiveSet<Event>;

/// The live emphasis beam collection.
pub type BeamStore = LiveSet<EmphasisBeam>;

impl<T: Aged> LiveSet<T> {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append an item. No deduplication: identical items are independent
    /// entries.
    pub fn insert(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove every item whose age at `now` is at least `ttl_ms`.
    ///
    /// Scans from the oldest end and stops at the first live item. Returns
    /// the number of items removed. Calling it again with the same `now`
    /// removes nothing.
    pub fn evict_expired(&mut self, now: Timestamp, ttl_ms: u64) -> usize {
        let expired = self
            .items
            .iter()
            .take_while(|item| item.is_expired(now, ttl_ms))
            .count();
        self.items.drain(..expired);
        expired
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read-only iteration, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Aged + Clone> LiveSet<T> {
    /// Owned copy of the live items, oldest first.
    pub fn live_snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Aged> Default for LiveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
