//! `reqwest`-backed poll source.

use std::time::Duration;

use geopulse_core::config::FeedConfig;
use geopulse_core::ingest::{PollError, PollSource, parse_batch};
use geopulse_types::RawRecord;
use tracing::debug;

use crate::error::FeedError;

/// Polls a fixed URL with `GET` and parses the body as a record array.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    /// Create a feed for `url`. The timeout caps both connecting and the
    /// whole request; without one a request may stay in flight
    /// indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Url`] if `url` is not an `http(s)` URL, or
    /// [`FeedError::Client`] if the client cannot be built.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FeedError::Url(url.to_owned()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.to_owned(),
        })
    }

    /// Create a feed from configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpFeed::new`].
    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        Self::new(&config.url, config.request_timeout())
    }

    /// The polled URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get(&self) -> Result<Vec<RawRecord>, PollError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PollError::Transport(format!("GET {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PollError::Transport(format!("reading body failed: {e}")))?;
        debug!(url = %self.url, bytes = body.len(), "Feed response received");
        parse_batch(&body)
    }
}

impl PollSource for HttpFeed {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawRecord>, PollError>> + Send {
        self.get()
    }
}
