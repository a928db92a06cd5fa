//! CSV replay of recorded packages.
//!
//! Each row of the replay file becomes one collector submission. Rows are
//! sent in file order, and the gap between consecutive rows' timestamps is
//! slept before each send, so a recording plays back at its recorded pace.
//! A row whose timestamp goes backwards is sent immediately.

use std::path::Path;
use std::time::Duration;

use geopulse_observer::IncomingPackage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SenderError;

/// One row of the replay file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayRow {
    /// Source address.
    #[serde(rename = "ip address")]
    pub ip: String,
    /// Latitude in degrees.
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Unix timestamp in seconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    /// Suspicious marker, recorded as a number (`0`, `1`, `1.0`).
    pub suspicious: f64,
}

impl ReplayRow {
    /// The collector submission for this row. The country is left for the
    /// collector to resolve.
    pub fn to_package(&self) -> IncomingPackage {
        IncomingPackage {
            latitude: self.latitude,
            longitude: self.longitude,
            suspicious: self.suspicious.trunc().abs() >= 1.0,
            country: String::new(),
            ip: Some(self.ip.clone()),
            timestamp: Some(self.timestamp),
        }
    }
}

/// Decode replay rows from CSV text with a header line.
pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<ReplayRow>, SenderError> {
    let rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<ReplayRow>, _>>()?;
    Ok(rows)
}

/// Load every row of the replay file at `path`.
///
/// # Errors
///
/// Returns [`SenderError::Csv`] if the file cannot be read or a row does
/// not decode, and [`SenderError::Empty`] if it holds no rows.
pub fn load_rows(path: &Path) -> Result<Vec<ReplayRow>, SenderError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let rows = read_rows(file)?;
    if rows.is_empty() {
        return Err(SenderError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(rows)
}

/// Pause before sending `next` when `previous` was the last row sent.
pub fn delay_between(previous: &ReplayRow, next: &ReplayRow) -> Duration {
    let gap = next.timestamp.saturating_sub(previous.timestamp);
    Duration::from_secs(u64::try_from(gap).unwrap_or(0))
}

/// Outcome of one pass over the replay file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Packages the collector accepted.
    pub sent: usize,
    /// Packages that failed to send or were refused.
    pub failed: usize,
}

/// Submits packages to a collector endpoint.
#[derive(Debug, Clone)]
pub struct Replayer {
    client: reqwest::Client,
    url: String,
}

impl Replayer {
    /// Create a replayer posting to `url`, giving up on each request after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SenderError::Client`] if the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SenderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.trim().to_owned(),
        })
    }

    /// The collector endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, package: &IncomingPackage) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(package)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Send every row once, pacing by the rows' timestamps.
    ///
    /// Failed sends are logged and counted; the pass continues.
    pub async fn replay(&self, rows: &[ReplayRow]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        let mut previous: Option<&ReplayRow> = None;

        for row in rows {
            if let Some(previous) = previous {
                let delay = delay_between(previous, row);
                if !delay.is_zero() {
                    debug!(delay = ?delay, "Waiting for next package");
                    tokio::time::sleep(delay).await;
                }
            }
            previous = Some(row);

            let package = row.to_package();
            match self.send(&package).await {
                Ok(()) => {
                    summary.sent = summary.sent.saturating_add(1);
                    debug!(
                        ip = %row.ip,
                        latitude = row.latitude,
                        longitude = row.longitude,
                        suspicious = package.suspicious,
                        "Package sent"
                    );
                }
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(ip = %row.ip, error = %e, "Failed to send package");
                }
            }
        }

        info!(sent = summary.sent, failed = summary.failed, "Replay pass complete");
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use geopulse_core::config::StyleConfig;
    use geopulse_observer::{AppState, build_router};

    use super::*;

    const SAMPLE: &str = "\
ip address,Latitude,Longitude,Timestamp,suspicious
10.0.0.1, 48.85, 2.35, 1700000000, 1.0
10.0.0.2, -33.87, 151.21, 1700000000, 0.0
10.0.0.3, 35.68, 139.69, 1700000003, 0
";

    fn row(timestamp: i64, suspicious: f64) -> ReplayRow {
        ReplayRow {
            ip: "10.0.0.9".to_owned(),
            latitude: 0.0,
            longitude: 0.0,
            timestamp,
            suspicious,
        }
    }

    #[test]
    fn reads_header_keyed_rows() {
        let rows = read_rows(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        let first = rows.first().unwrap();
        assert_eq!(first.ip, "10.0.0.1");
        assert!((first.latitude - 48.85).abs() < f64::EPSILON);
        assert_eq!(first.timestamp, 1_700_000_000);
    }

    #[test]
    fn malformed_row_is_an_error() {
        let text = "ip address,Latitude,Longitude,Timestamp,suspicious\n10.0.0.1,north,2.35,1,0\n";
        assert!(matches!(read_rows(text.as_bytes()), Err(SenderError::Csv { .. })));
    }

    #[test]
    fn delay_follows_timestamp_gaps() {
        assert_eq!(delay_between(&row(100, 0.0), &row(103, 0.0)), Duration::from_secs(3));
        assert_eq!(delay_between(&row(100, 0.0), &row(100, 0.0)), Duration::ZERO);
        assert_eq!(delay_between(&row(100, 0.0), &row(90, 0.0)), Duration::ZERO);
    }

    #[test]
    fn suspicious_marker_truncates_like_an_integer() {
        assert!(row(0, 1.0).to_package().suspicious);
        assert!(row(0, 2.7).to_package().suspicious);
        assert!(!row(0, 0.9).to_package().suspicious);
        assert!(!row(0, 0.0).to_package().suspicious);
    }

    #[test]
    fn package_leaves_country_to_the_collector() {
        let package = row(42, 1.0).to_package();
        assert!(package.country.is_empty());
        assert_eq!(package.ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(package.timestamp, Some(42));
    }

    #[tokio::test]
    async fn replay_fills_the_collector_queue() {
        let state = Arc::new(AppState::new(16, false, StyleConfig::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        // Same timestamps, so nothing sleeps.
        let rows: Vec<ReplayRow> = read_rows(SAMPLE.as_bytes()).unwrap().into_iter().take(2).collect();
        let replayer = Replayer::new(
            &format!("http://{addr}/api/package"),
            Duration::from_secs(1),
        )
        .unwrap();

        let summary = replayer.replay(&rows).await;
        assert_eq!(summary, ReplaySummary { sent: 2, failed: 0 });

        let queued = state.packages.drain().await;
        assert_eq!(queued.len(), 2);
        assert!(queued.first().unwrap().suspicious);
        assert_eq!(queued.first().unwrap().ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(queued.last().unwrap().country, "Unknown");
    }

    #[tokio::test]
    async fn unreachable_collector_counts_failures() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let replayer = Replayer::new(
            &format!("http://{addr}/api/package"),
            Duration::from_millis(200),
        )
        .unwrap();
        let summary = replayer.replay(&[row(1, 0.0), row(1, 1.0)]).await;
        assert_eq!(summary, ReplaySummary { sent: 0, failed: 2 });
    }
}
