//! Configuration loading and typed config structures for `GeoPulse`.
//!
//! The canonical configuration lives in `geopulse-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration.

use std::path::Path;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use crate::ingest::OverlapPolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `geopulse-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeoPulseConfig {
    /// Event lifetime and marker geometry.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Rolling window sizes for the aggregates.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Poll timer and overlap policy.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// HTTP poll source.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Render tick.
    #[serde(default)]
    pub render: RenderConfig,

    /// Chart label formatting.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Style parameters passed through to renderers untouched.
    #[serde(default)]
    pub style: StyleConfig,

    /// Observer HTTP server and collector queue.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GeoPulseConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `GEOPULSE_FEED_URL` overrides `feed.url`
    /// - `GEOPULSE_OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the deployment-specific
    /// sections.
    pub fn apply_env_overrides(&mut self) {
        self.feed.apply_env_overrides();
        self.observer.apply_env_overrides();
    }

    /// Check that every duration, window and size is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.lifecycle.ttl_ms == 0, "lifecycle.ttl_ms must be at least 1"),
            (
                self.aggregation.category_window_ms == 0,
                "aggregation.category_window_ms must be at least 1",
            ),
            (
                self.aggregation.rate_window_secs == 0,
                "aggregation.rate_window_secs must be at least 1",
            ),
            (self.aggregation.top_n == 0, "aggregation.top_n must be at least 1"),
            (
                self.ingest.poll_interval_ms == 0,
                "ingest.poll_interval_ms must be at least 1",
            ),
            (
                self.ingest.command_buffer == 0,
                "ingest.command_buffer must be at least 1",
            ),
            (
                self.render.tick_interval_ms == 0,
                "render.tick_interval_ms must be at least 1",
            ),
            (
                self.observer.collector_capacity == 0,
                "observer.collector_capacity must be at least 1",
            ),
            (
                !(self.lifecycle.point_radius.is_finite() && self.lifecycle.point_radius > 0.0),
                "lifecycle.point_radius must be a positive number",
            ),
            (
                !(self.lifecycle.beam_length.is_finite() && self.lifecycle.beam_length >= 0.0),
                "lifecycle.beam_length must be a non-negative number",
            ),
            (self.feed.url.trim().is_empty(), "feed.url must not be empty"),
            (
                self.feed.request_timeout_ms == Some(0),
                "feed.request_timeout_ms must be at least 1",
            ),
            (
                StrftimeItems::new(&self.chart.label_format).any(|item| matches!(item, Item::Error)),
                "chart.label_format is not a valid strftime pattern",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(ConfigError::Invalid {
                reason: (*reason).to_owned(),
            }),
            None => Ok(()),
        }
    }
}

/// Event lifetime and marker geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LifecycleConfig {
    /// Milliseconds an event (and its beam) stays alive.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Radius at which event markers are placed (globe radius is 1.0).
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,

    /// Length of the emphasis beam on flagged events.
    #[serde(default = "default_beam_length")]
    pub beam_length: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            point_radius: default_point_radius(),
            beam_length: default_beam_length(),
        }
    }
}

/// Rolling window sizes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregationConfig {
    /// Retention of the top-N category window in milliseconds.
    #[serde(default = "default_category_window_ms")]
    pub category_window_ms: u64,

    /// Span of the per-second rate window in seconds.
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Number of categories reported.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            category_window_ms: default_category_window_ms(),
            rate_window_secs: default_rate_window_secs(),
            top_n: default_top_n(),
        }
    }
}

/// Poll timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngestConfig {
    /// Milliseconds between poll timer ticks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// What to do when the timer fires while a poll is still in flight.
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// Capacity of the command queue feeding the lifecycle task.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl IngestConfig {
    /// The poll period as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            overlap_policy: OverlapPolicy::default(),
            command_buffer: default_command_buffer(),
        }
    }
}

/// HTTP poll source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Endpoint returning the JSON array of pending records.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Transport timeout in milliseconds, also used as the connect
    /// timeout. `null` disables it, leaving a hung request in flight.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
}

impl FeedConfig {
    /// Override the feed URL with `GEOPULSE_FEED_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GEOPULSE_FEED_URL") {
            self.url = val;
        }
    }

    /// The transport timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Render tick configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Milliseconds between fade passes (16 ms is roughly 60 Hz).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl RenderConfig {
    /// The render period as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Chart label configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChartConfig {
    /// `chrono` format string applied to each bucket second (UTC).
    #[serde(default = "default_label_format")]
    pub label_format: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            label_format: default_label_format(),
        }
    }
}

/// Colors handed to renderers. The engine never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct StyleConfig {
    /// Color of regular event markers.
    #[serde(default = "default_point_color")]
    pub point_color: String,

    /// Color of flagged event markers.
    #[serde(default = "default_flagged_color")]
    pub flagged_color: String,

    /// Color of emphasis beams.
    #[serde(default = "default_flagged_color")]
    pub beam_color: String,

    /// Line color of the rate chart.
    #[serde(default = "default_chart_line_color")]
    pub chart_line_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            point_color: default_point_color(),
            flagged_color: default_flagged_color(),
            beam_color: default_flagged_color(),
            chart_line_color: default_chart_line_color(),
        }
    }
}

/// Observer server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_observer_port")]
    pub port: u16,

    /// Maximum number of packages held by the collector queue.
    #[serde(default = "default_collector_capacity")]
    pub collector_capacity: usize,

    /// Resolve a country from the coordinates of packages submitted
    /// without one.
    #[serde(default = "default_reverse_geocode")]
    pub reverse_geocode: bool,
}

impl ObserverConfig {
    /// Override the port with `GEOPULSE_OBSERVER_PORT` when it is set and
    /// parses as a port number.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GEOPULSE_OBSERVER_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => {
                    tracing::warn!(value = %val, error = %e, "ignoring invalid GEOPULSE_OBSERVER_PORT");
                }
            }
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
            collector_capacity: default_collector_capacity(),
            reverse_geocode: default_reverse_geocode(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_ttl_ms() -> u64 {
    10_000
}

const fn default_point_radius() -> f64 {
    1.01
}

const fn default_beam_length() -> f64 {
    0.2
}

const fn default_category_window_ms() -> u64 {
    10_000
}

const fn default_rate_window_secs() -> u64 {
    15
}

const fn default_top_n() -> usize {
    5
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_command_buffer() -> usize {
    256
}

fn default_feed_url() -> String {
    "http://localhost:5000/api/get_packages".to_owned()
}

const fn default_request_timeout_ms() -> Option<u64> {
    Some(5_000)
}

const fn default_tick_interval_ms() -> u64 {
    16
}

fn default_label_format() -> String {
    "%H:%M:%S".to_owned()
}

fn default_point_color() -> String {
    "#00ffff".to_owned()
}

fn default_flagged_color() -> String {
    "#ff0000".to_owned()
}

fn default_chart_line_color() -> String {
    "#ff77ff".to_owned()
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

const fn default_collector_capacity() -> usize {
    1_000
}

const fn default_reverse_geocode() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GeoPulseConfig::default();
        assert_eq!(config.lifecycle.ttl_ms, 10_000);
        assert_eq!(config.aggregation.category_window_ms, 10_000);
        assert_eq!(config.aggregation.rate_window_secs, 15);
        assert_eq!(config.aggregation.top_n, 5);
        assert_eq!(config.ingest.poll_interval_ms, 1_000);
        assert_eq!(config.ingest.overlap_policy, OverlapPolicy::Skip);
        assert_eq!(config.feed.request_timeout(), Some(Duration::from_secs(5)));
        assert!(config.observer.reverse_geocode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn null_timeout_disables_it_and_zero_is_rejected() {
        let config = GeoPulseConfig::parse("feed:\n  request_timeout_ms: null\n")
            .ok()
            .unwrap_or_default();
        assert_eq!(config.feed.request_timeout(), None);
        assert!(config.validate().is_ok());

        let mut config = GeoPulseConfig::default();
        config.feed.request_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r##"
lifecycle:
  ttl_ms: 5000
  point_radius: 1.05
  beam_length: 0.3

aggregation:
  category_window_ms: 8000
  rate_window_secs: 30
  top_n: 3

ingest:
  poll_interval_ms: 500
  overlap_policy: allow
  command_buffer: 64

feed:
  url: "http://collector:5000/api/get_packages"
  request_timeout_ms: 2500

render:
  tick_interval_ms: 33

chart:
  label_format: "%M:%S"

style:
  point_color: "#ffffff"

observer:
  host: "127.0.0.1"
  port: 9090
  collector_capacity: 50
  reverse_geocode: false

logging:
  level: "debug"
"##;

        let config = GeoPulseConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.lifecycle.ttl_ms, 5_000);
        assert_eq!(config.aggregation.top_n, 3);
        assert_eq!(config.ingest.overlap_policy, OverlapPolicy::Allow);
        assert_eq!(config.ingest.poll_interval(), Duration::from_millis(500));
        assert_eq!(
            config.feed.request_timeout(),
            Some(Duration::from_millis(2_500))
        );
        assert_eq!(config.render.tick_interval(), Duration::from_millis(33));
        assert_eq!(config.chart.label_format, "%M:%S");
        assert_eq!(config.style.point_color, "#ffffff");
        assert_eq!(config.style.flagged_color, "#ff0000");
        assert_eq!(config.observer.collector_capacity, 50);
        assert!(!config.observer.reverse_geocode);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "lifecycle:\n  ttl_ms: 2000\n";
        let config = GeoPulseConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // TTL is overridden
        assert_eq!(config.lifecycle.ttl_ms, 2_000);
        // Everything else uses defaults
        assert_eq!(config.aggregation.rate_window_secs, 15);
        assert_eq!(config.render.tick_interval_ms, 16);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = GeoPulseConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn unknown_overlap_policy_is_rejected() {
        let yaml = "ingest:\n  overlap_policy: queue\n";
        assert!(GeoPulseConfig::parse(yaml).is_err());
    }

    #[test]
    fn zero_ttl_fails_validation() {
        let mut config = GeoPulseConfig::default();
        config.lifecycle.ttl_ms = 0;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_top_n_fails_validation() {
        let mut config = GeoPulseConfig::default();
        config.aggregation.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_radius_fails_validation() {
        let mut config = GeoPulseConfig::default();
        config.lifecycle.point_radius = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn broken_label_format_fails_validation() {
        let mut config = GeoPulseConfig::default();
        config.chart.label_format = "%H:%".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("geopulse-config.yaml");
        if path.exists() {
            let config = GeoPulseConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
