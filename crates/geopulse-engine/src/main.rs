//! Engine binary for `GeoPulse`.
//!
//! This is the main entry point that wires together the HTTP feed, the
//! lifecycle engine and the observer dashboard. It loads configuration,
//! initializes all subsystems, and runs the lifecycle loop until the
//! process is asked to stop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geopulse-config.yaml` (or `GEOPULSE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the monotonic engine clock
//! 4. Build the HTTP feed
//! 5. Start the observer API server and collector
//! 6. Spawn the ingestion loop
//! 7. Run the lifecycle loop until Ctrl-C
//! 8. Log the final counters

mod error;
mod observer_sink;

use std::path::PathBuf;
use std::sync::Arc;

use geopulse_core::clock::{Clock, MonotonicClock};
use geopulse_core::config::GeoPulseConfig;
use geopulse_core::lifecycle::LifecycleService;
use geopulse_core::runner::{IngestionLoop, run_lifecycle};
use geopulse_feed::HttpFeed;
use geopulse_observer::{AppState, ServerConfig};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_sink::ObserverSink;

/// Config file used when `GEOPULSE_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "geopulse-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the feed or the observer cannot be
/// set up. Nothing after startup is fatal.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("geopulse-engine starting");
    info!(
        source = %source.as_deref().map_or_else(|| "defaults".to_owned(), |p| p.display().to_string()),
        ttl_ms = config.lifecycle.ttl_ms,
        poll_interval_ms = config.ingest.poll_interval_ms,
        overlap_policy = ?config.ingest.overlap_policy,
        tick_interval_ms = config.render.tick_interval_ms,
        feed_url = %config.feed.url,
        "Configuration loaded"
    );

    // 3. Create the engine clock.
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());

    // 4. Build the HTTP feed.
    let feed = Arc::new(HttpFeed::from_config(&config.feed)?);
    info!(url = feed.url(), "HTTP feed ready");

    // 5. Start the observer API server.
    let app_state = Arc::new(AppState::new(
        config.observer.collector_capacity,
        config.observer.reverse_geocode,
        config.style.clone(),
    ));
    let observer_handle = geopulse_observer::spawn_observer(
        ServerConfig::from_config(&config.observer),
        Arc::clone(&app_state),
    )?;

    // 6. Spawn the ingestion loop.
    let (tx, rx) = mpsc::channel(config.ingest.command_buffer);
    let ingestion = IngestionLoop::new(
        feed,
        Arc::clone(&clock),
        config.ingest.overlap_policy,
        config.ingest.poll_interval(),
    );
    let ingestion_handle = tokio::spawn(ingestion.run(tx));

    // Ctrl-C stops polling; the lifecycle loop then drains and returns.
    let stop_polling = ingestion_handle.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, stopping ingestion");
            stop_polling.abort();
        }
    });

    // 7. Run the lifecycle loop.
    let service = LifecycleService::from_config(&config);
    let mut sink = ObserverSink::new(app_state);
    let stats = run_lifecycle(service, rx, clock, config.render.tick_interval(), &mut sink).await;

    // 8. Log the final counters.
    info!(
        polls_succeeded = stats.polls_succeeded,
        polls_failed = stats.polls_failed,
        polls_skipped = stats.polls_skipped,
        events_ingested = stats.events_ingested,
        records_rejected = stats.records_rejected,
        events_evicted = stats.events_evicted,
        "geopulse-engine stopped"
    );
    observer_handle.abort();

    Ok(())
}

/// Load configuration from the config file, or defaults if it does not
/// exist. Environment overrides apply in both cases.
///
/// Returns the configuration and the file it came from, if any.
fn load_config() -> Result<(GeoPulseConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var("GEOPULSE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    let (config, source) = if path.exists() {
        (GeoPulseConfig::from_file(&path)?, Some(path))
    } else {
        let mut config = GeoPulseConfig::default();
        config.apply_env_overrides();
        (config, None)
    };

    config.validate()?;
    Ok((config, source))
}
