//! Dashboard API server and package collector for `GeoPulse`.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/dashboard`) streaming scene frames and
//!   aggregate reports via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the latest scene, rate chart, top categories,
//!   lifecycle counters and renderer colors
//! - **Collector endpoints** (`/api/package`, `/api/get_packages`): a
//!   bounded queue that senders fill and the engine's poll source drains,
//!   with offline reverse geocoding for packages that carry no country
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`DashboardSnapshot`] that the
//! engine's frame sink replaces after every frame and report. Handlers
//! only ever read it, so the observer never blocks the lifecycle loop.
//!
//! [`DashboardSnapshot`]: state::DashboardSnapshot

pub mod collector;
pub mod error;
pub mod geocode;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use collector::{IncomingPackage, PackageQueue};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, DashboardMessage, DashboardSnapshot};
