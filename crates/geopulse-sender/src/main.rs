//! Sender binary for `GeoPulse`.
//!
//! Replays a recorded CSV of packages into the collector's `/api/package`
//! endpoint, pacing sends by the recorded timestamps. By default the file
//! is replayed in a loop until Ctrl-C.
//!
//! The replay file needs the header
//! `ip address,Latitude,Longitude,Timestamp,suspicious`.

mod error;
mod replay;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::SenderError;
use crate::replay::{Replayer, load_rows};

/// Replay recorded packages into a collector.
#[derive(Debug, Parser)]
#[command(name = "geopulse-sender", version)]
struct Cli {
    /// CSV file to replay.
    #[arg(long, env = "GEOPULSE_SENDER_FILE", default_value = "ip_addresses.csv")]
    file: PathBuf,

    /// Collector endpoint receiving each package.
    #[arg(
        long,
        env = "GEOPULSE_SENDER_URL",
        default_value = "http://localhost:8080/api/package"
    )]
    url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "GEOPULSE_SENDER_TIMEOUT_MS", default_value_t = 1_000)]
    timeout_ms: u64,

    /// Stop after one pass instead of looping.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), SenderError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let rows = load_rows(&cli.file)?;
    let replayer = Replayer::new(&cli.url, Duration::from_millis(cli.timeout_ms))?;
    info!(
        file = %cli.file.display(),
        rows = rows.len(),
        url = replayer.url(),
        once = cli.once,
        "geopulse-sender starting"
    );

    let replay = async {
        loop {
            replayer.replay(&rows).await;
            if cli.once {
                break;
            }
            info!("All packages sent, starting the file again");
        }
    };

    tokio::select! {
        () = replay => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    info!("geopulse-sender stopped");
    Ok(())
}
