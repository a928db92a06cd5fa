//! Rolling-window aggregates over recent events.
//!
//! The aggregator keeps its own record of `(created_at, category)` facts,
//! independent of the event store, so the windows do not depend on the
//! event TTL.
//!
//! - [`CategoryWindow`] answers "which categories were most frequent in the
//!   last N milliseconds". Counts are rebuilt from the retained records on
//!   every query.
//! - [`RateWindow`] keeps one-second buckets for the trailing N seconds and
//!   drives the rate chart.

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use geopulse_types::{AggregateReport, CategoryCount, ChartPoint, Event, RateBucket, Timestamp};
use tracing::debug;

use crate::config::{AggregationConfig, ChartConfig};

// ---------------------------------------------------------------------------
// Top-N categories
// ---------------------------------------------------------------------------

/// Trailing window of category occurrences.
///
/// A record is retained while its age is strictly below the window, so an
/// event recorded at t=0 with a 10 s window counts at t=9.999 s but not at
/// t=10 s.
#[derive(Debug, Clone)]
pub struct CategoryWindow {
    records: VecDeque<(Timestamp, String)>,
    window_ms: u64,
    top_n: usize,
}

impl CategoryWindow {
    /// Create an empty window.
    pub const fn new(window_ms: u64, top_n: usize) -> Self {
        Self {
            records: VecDeque::new(),
            window_ms,
            top_n,
        }
    }

    /// Record one occurrence of `category` at `at`.
    pub fn record(&mut self, at: Timestamp, category: &str) {
        self.records.push_back((at, category.to_owned()));
        self.prune(at);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most frequent categories at `now`, by descending count.
    ///
    /// Equal counts are ordered by first appearance inside the window: the
    /// category whose oldest retained record is older ranks first.
    pub fn top(&mut self, now: Timestamp) -> Vec<CategoryCount> {
        self.prune(now);

        let mut counts: Vec<CategoryCount> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for (_, category) in &self.records {
            if let Some(entry) = slots
                .get(category.as_str())
                .and_then(|&slot| counts.get_mut(slot))
            {
                entry.count = entry.count.saturating_add(1);
            } else {
                slots.insert(category.as_str(), counts.len());
                counts.push(CategoryCount {
                    category: category.clone(),
                    count: 1,
                });
            }
        }

        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by_key(|c| Reverse(c.count));
        counts.truncate(self.top_n);
        counts
    }

    fn prune(&mut self, now: Timestamp) {
        while self
            .records
            .front()
            .is_some_and(|(at, _)| at.age_at(now) >= self.window_ms)
        {
            self.records.pop_front();
        }
    }
}

// ---------------------------------------------------------------------------
// Per-second rate
// ---------------------------------------------------------------------------

/// Trailing window of one-second event counts.
///
/// Buckets are strictly increasing by second. Only seconds that saw at
/// least one event have a bucket. Once a second has fallen out of the
/// window it is never re-created, even by a late record.
#[derive(Debug, Clone)]
pub struct RateWindow {
    buckets: VecDeque<RateBucket>,
    span_secs: u64,
    floor: u64,
}

impl RateWindow {
    /// Create an empty window spanning `span_secs` seconds.
    pub const fn new(span_secs: u64) -> Self {
        Self {
            buckets: VecDeque::new(),
            span_secs,
            floor: 0,
        }
    }

    /// Count one event at `at`. Returns `false` if the event's second has
    /// already been dropped from the window.
    pub fn record(&mut self, at: Timestamp) -> bool {
        let second = at.whole_seconds();
        if second < self.floor {
            return false;
        }

        match self.buckets.binary_search_by_key(&second, |b| b.second) {
            Ok(slot) => {
                if let Some(bucket) = self.buckets.get_mut(slot) {
                    bucket.count = bucket.count.saturating_add(1);
                }
            }
            Err(slot) => self.buckets.insert(slot, RateBucket { second, count: 1 }),
        }

        self.prune(second);
        true
    }

    /// Buckets inside the window ending at `now`, oldest first.
    pub fn series(&mut self, now: Timestamp) -> Vec<RateBucket> {
        self.prune(now.whole_seconds());
        self.buckets.iter().copied().collect()
    }

    fn prune(&mut self, now_second: u64) {
        self.floor = self.floor.max(now_second.saturating_sub(self.span_secs));
        while self.buckets.front().is_some_and(|b| b.second < self.floor) {
            self.buckets.pop_front();
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Both rolling windows plus chart label formatting.
#[derive(Debug, Clone)]
pub struct Aggregator {
    categories: CategoryWindow,
    rate: RateWindow,
    label_format: String,
}

impl Aggregator {
    /// Create an aggregator with explicit window sizes.
    pub fn new(
        category_window_ms: u64,
        top_n: usize,
        rate_window_secs: u64,
        label_format: &str,
    ) -> Self {
        Self {
            categories: CategoryWindow::new(category_window_ms, top_n),
            rate: RateWindow::new(rate_window_secs),
            label_format: label_format.to_owned(),
        }
    }

    /// Create an aggregator from configuration.
    pub fn from_config(aggregation: &AggregationConfig, chart: &ChartConfig) -> Self {
        Self::new(
            aggregation.category_window_ms,
            aggregation.top_n,
            aggregation.rate_window_secs,
            &chart.label_format,
        )
    }

    /// Feed one ingested event into both windows.
    pub fn record(&mut self, event: &Event) {
        self.categories.record(event.created_at, &event.category);
        if !self.rate.record(event.created_at) {
            debug!(
                event_id = %event.id,
                created_at = %event.created_at,
                "late event dropped from rate window"
            );
        }
    }

    /// Evaluate both windows at `now`.
    pub fn report(&mut self, now: Timestamp) -> AggregateReport {
        let top_categories = self.categories.top(now);
        let rate = self.rate.series(now);
        let chart = rate
            .iter()
            .map(|bucket| ChartPoint {
                label: self.label(bucket.second),
                value: bucket.count,
            })
            .collect();

        AggregateReport {
            at: now,
            top_categories,
            rate,
            chart,
        }
    }

    /// Render a bucket second as a UTC chart label, falling back to the raw
    /// second count if it cannot be formatted.
    fn label(&self, second: u64) -> String {
        let mut label = String::new();
        let formatted = Timestamp::from_secs(second)
            .to_datetime()
            .is_some_and(|at| write!(label, "{}", at.format(&self.label_format)).is_ok());
        if formatted {
            label
        } else {
            second.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geopulse_types::EventId;

    use super::*;

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn pairs(counts: &[CategoryCount]) -> Vec<(&str, u32)> {
        counts.iter().map(|c| (c.category.as_str(), c.count)).collect()
    }

    fn seconds(buckets: &[RateBucket]) -> Vec<(u64, u32)> {
        buckets.iter().map(|b| (b.second, b.count)).collect()
    }

    #[test]
    fn top_counts_by_descending_frequency() {
        let mut window = CategoryWindow::new(10_000, 5);
        for category in ["A", "A", "A", "B", "B", "C"] {
            window.record(ms(1_000), category);
        }
        assert_eq!(pairs(&window.top(ms(1_000))), [("A", 3), ("B", 2), ("C", 1)]);
    }

    #[test]
    fn top_window_boundary_is_exclusive() {
        let mut window = CategoryWindow::new(10_000, 5);
        window.record(ms(0), "A");
        assert_eq!(pairs(&window.top(ms(9_999))), [("A", 1)]);
        assert!(window.top(ms(10_000)).is_empty());
        assert!(window.top(ms(10_001)).is_empty());
    }

    #[test]
    fn top_ties_favor_first_seen() {
        let mut window = CategoryWindow::new(10_000, 5);
        window.record(ms(100), "Z");
        window.record(ms(200), "A");
        window.record(ms(300), "A");
        window.record(ms(400), "Z");
        assert_eq!(pairs(&window.top(ms(500))), [("Z", 2), ("A", 2)]);
    }

    #[test]
    fn top_tie_break_only_considers_retained_records() {
        let mut window = CategoryWindow::new(1_000, 5);
        window.record(ms(0), "A");
        window.record(ms(500), "B");
        window.record(ms(900), "A");
        window.record(ms(950), "B");
        window.record(ms(990), "A");
        // At t=1000 the first A has left the window, so B is now older.
        assert_eq!(pairs(&window.top(ms(1_000))), [("B", 2), ("A", 2)]);
    }

    #[test]
    fn top_truncates_to_limit() {
        let mut window = CategoryWindow::new(10_000, 5);
        for (i, category) in ["A", "B", "C", "D", "E", "F", "G"].iter().enumerate() {
            for _ in 0..=i {
                window.record(ms(10), category);
            }
        }
        let top = window.top(ms(10));
        assert_eq!(top.len(), 5);
        assert_eq!(top.first().unwrap().category, "G");
        assert_eq!(top.last().unwrap().category, "C");
    }

    #[test]
    fn category_buffer_is_pruned_on_append() {
        let mut window = CategoryWindow::new(1_000, 5);
        for step in 0..100_u64 {
            window.record(ms(step.saturating_mul(100)), "A");
        }
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn rate_buckets_per_second() {
        let mut window = RateWindow::new(15);
        for at in [10_000, 10_500, 11_200, 13_900] {
            assert!(window.record(ms(at)));
        }
        assert_eq!(seconds(&window.series(ms(13_000))), [(10, 2), (11, 1), (13, 1)]);
    }

    #[test]
    fn rate_drops_buckets_older_than_span() {
        let mut window = RateWindow::new(15);
        window.record(ms(10_000));
        window.record(ms(20_000));
        assert_eq!(seconds(&window.series(ms(25_000))), [(10, 1), (20, 1)]);
        assert_eq!(seconds(&window.series(ms(26_000))), [(20, 1)]);
        assert!(window.series(ms(40_000)).is_empty());
    }

    #[test]
    fn rate_discards_records_below_applied_cutoff() {
        let mut window = RateWindow::new(15);
        window.record(ms(40_000));
        assert!(!window.record(ms(20_000)));
        assert_eq!(seconds(&window.series(ms(40_000))), [(40, 1)]);
    }

    #[test]
    fn rate_inserts_late_record_in_order() {
        let mut window = RateWindow::new(15);
        window.record(ms(10_000));
        window.record(ms(13_000));
        assert!(window.record(ms(11_000)));
        assert!(window.record(ms(13_500)));
        assert_eq!(seconds(&window.series(ms(13_000))), [(10, 1), (11, 1), (13, 2)]);
    }

    #[test]
    fn report_labels_chart_in_utc() {
        let mut aggregator = Aggregator::new(10_000, 5, 15, "%H:%M:%S");
        let event = Event {
            id: EventId::new(),
            latitude: 0.0,
            longitude: 0.0,
            category: "A".to_owned(),
            flagged: false,
            // 1970-01-02 01:02:03 UTC
            created_at: ms(90_123_000),
        };
        aggregator.record(&event);
        let report = aggregator.report(ms(90_123_500));

        assert_eq!(report.at, ms(90_123_500));
        assert_eq!(pairs(&report.top_categories), [("A", 1)]);
        assert_eq!(seconds(&report.rate), [(90_123, 1)]);
        let point = report.chart.first().unwrap();
        assert_eq!(point.label, "01:02:03");
        assert_eq!(point.value, 1);
    }

    #[test]
    fn category_and_rate_windows_are_independent() {
        let mut aggregator = Aggregator::new(2_000, 5, 15, "%S");
        let event = Event {
            id: EventId::new(),
            latitude: 0.0,
            longitude: 0.0,
            category: "A".to_owned(),
            flagged: true,
            created_at: ms(5_000),
        };
        aggregator.record(&event);
        let report = aggregator.report(ms(8_000));
        assert!(report.top_categories.is_empty());
        assert_eq!(seconds(&report.rate), [(5, 1)]);
        assert_eq!(report.chart.first().unwrap().label, "05");
    }
}
