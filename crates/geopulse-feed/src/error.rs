//! Error types for the HTTP feed.

/// Errors that can occur while setting up the feed.
///
/// Errors of individual polls are reported as
/// [`PollError`](geopulse_core::ingest::PollError) instead.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The configured URL is unusable.
    #[error("invalid feed URL: {0}")]
    Url(String),
}
