//! Observer server startup helper for embedding in the engine.
//!
//! Provides [`spawn_observer`] which launches the observer HTTP +
//! `WebSocket` server on a background Tokio task, so the dashboard and the
//! collector run concurrently with the lifecycle loops.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the observer HTTP server on a background Tokio task.
///
/// Returns a [`JoinHandle`] so the caller can manage the server's
/// lifecycle alongside the engine loops. The server runs until the Tokio
/// runtime is shut down or the task is aborted.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse. Bind failures happen on the background task and are logged.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
