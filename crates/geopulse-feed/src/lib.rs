//! HTTP poll source for the `GeoPulse` event globe.
//!
//! [`HttpFeed`] implements the core
//! [`PollSource`](geopulse_core::ingest::PollSource) seam on top of
//! `reqwest`. Connection failures and timeouts surface as
//! `PollError::Transport`, non-success statuses as `PollError::Status`, and
//! bodies that are not a record array as `PollError::Malformed`.

pub mod error;
pub mod http;

pub use error::FeedError;
pub use http::HttpFeed;
