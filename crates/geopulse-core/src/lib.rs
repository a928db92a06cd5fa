//! Event lifecycle, fading and windowed aggregation for the `GeoPulse` globe.
//!
//! Events arrive in periodic poll batches, live for a fixed TTL while their
//! visual intensity fades linearly, and feed two rolling aggregates: the
//! most frequent categories over the last few seconds and a per-second
//! event rate.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic engine clock and a manual clock for tests.
//! - [`config`] -- Configuration loading from `geopulse-config.yaml` into
//!   strongly-typed structs.
//! - [`geo`] -- Latitude/longitude to globe-space projection.
//! - [`store`] -- Append-ordered live sets with O(k) age-based eviction.
//! - [`fade`] -- Liveness computation and the per-tick fade pass.
//! - [`aggregate`] -- Top-N category window and per-second rate window.
//! - [`ingest`] -- Payload parsing, per-record validation, [`PollSource`]
//!   and the poll overlap gate.
//! - [`lifecycle`] -- [`LifecycleService`], the single owner of all
//!   mutable engine state.
//! - [`runner`] -- The lifecycle and ingestion loops.
//!
//! [`PollSource`]: ingest::PollSource
//! [`LifecycleService`]: lifecycle::LifecycleService

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod fade;
pub mod geo;
pub mod ingest;
pub mod lifecycle;
pub mod runner;
pub mod store;
