//! REST API endpoint handlers for the observer server.
//!
//! Dashboard handlers read the latest [`DashboardSnapshot`] from the shared
//! [`AppState`]; collector handlers push to and drain the package queue.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/scene` | Latest scene frame (points and beams) |
//! | `GET` | `/api/chart` | Per-second rate chart series |
//! | `GET` | `/api/top` | Top categories in the sliding window |
//! | `GET` | `/api/stats` | Lifecycle counters |
//! | `GET` | `/api/style` | Renderer colors |
//! | `GET`, `POST` | `/api/package` | Submit one package |
//! | `GET` | `/api/get_packages` | Drain queued packages |
//!
//! [`DashboardSnapshot`]: crate::state::DashboardSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use tracing::{debug, warn};

use crate::collector::IncomingPackage;
use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing engine status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (stats, top) = {
        let snapshot = state.snapshot.read().await;
        (
            snapshot.stats,
            snapshot
                .report
                .top_categories
                .first()
                .map_or_else(|| "-".to_owned(), |c| format!("{} ({})", c.category, c.count)),
        )
    };
    let queued = state.packages.len().await;
    let live_events = stats.live_events;
    let live_beams = stats.live_beams;
    let ingested = stats.events_ingested;
    let failed = stats.polls_failed;
    let accent = &state.style.point_color;
    let flagged = &state.style.flagged_color;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>GeoPulse Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: {accent}; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: {accent}; font-size: 1.5rem; font-weight: bold; }}
        .metric .value.flagged {{ color: {flagged}; }}
        a {{ color: {accent}; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>GeoPulse Observer</h1>
    <p class="subtitle">Live geolocated package events</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Live events</div>
            <div class="value">{live_events}</div>
        </div>
        <div class="metric">
            <div class="label">Live beams</div>
            <div class="value flagged">{live_beams}</div>
        </div>
        <div class="metric">
            <div class="label">Ingested</div>
            <div class="value">{ingested}</div>
        </div>
        <div class="metric">
            <div class="label">Failed polls</div>
            <div class="value">{failed}</div>
        </div>
        <div class="metric">
            <div class="label">Queued</div>
            <div class="value">{queued}</div>
        </div>
        <div class="metric">
            <div class="label">Top category</div>
            <div class="value">{top}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/scene">/api/scene</a> -- Latest scene frame</li>
        <li>GET <a href="/api/chart">/api/chart</a> -- Rate chart series</li>
        <li>GET <a href="/api/top">/api/top</a> -- Top categories</li>
        <li>GET <a href="/api/stats">/api/stats</a> -- Lifecycle counters</li>
        <li>GET <a href="/api/style">/api/style</a> -- Renderer colors</li>
        <li>POST /api/package -- Submit a package</li>
        <li>GET <a href="/api/get_packages">/api/get_packages</a> -- Drain queued packages</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/dashboard</code> -- Live frames and reports</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Dashboard reads
// ---------------------------------------------------------------------------

/// Return the latest scene frame.
pub async fn get_scene(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let frame = &snapshot.frame;

    Ok(Json(serde_json::json!({
        "at": frame.at,
        "count": frame.points.len(),
        "points": serde_json::to_value(&frame.points)?,
        "beams": serde_json::to_value(&frame.beams)?,
    })))
}

/// Return the rate chart series.
pub async fn get_chart(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let chart = &snapshot.report.chart;

    Ok(Json(serde_json::json!({
        "count": chart.len(),
        "line_color": state.style.chart_line_color,
        "series": serde_json::to_value(chart)?,
    })))
}

/// Return the top categories.
pub async fn get_top(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let top = &snapshot.report.top_categories;

    Ok(Json(serde_json::json!({
        "count": top.len(),
        "categories": serde_json::to_value(top)?,
    })))
}

/// Return the lifecycle counters.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.snapshot.read().await.stats;
    Json(stats)
}

/// Return the renderer colors.
pub async fn get_style(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.style.clone())
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accept one package into the collector queue.
///
/// Accepts the JSON body on both `GET` and `POST`; the replay sender
/// issues `GET` requests with a body.
pub async fn receive_package(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IncomingPackage>, JsonRejection>,
) -> Result<StatusCode, ObserverError> {
    let Json(package) = payload.map_err(|e| {
        warn!(error = %e, "Rejected package submission");
        ObserverError::InvalidPackage(e.body_text())
    })?;

    if state.packages.push(package).await {
        debug!(
            capacity = state.packages.capacity(),
            "Collector queue full, oldest package dropped"
        );
    }
    Ok(StatusCode::OK)
}

/// Drain the collector queue as a JSON array of poll records.
pub async fn get_packages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let packages = state.packages.drain().await;
    debug!(count = packages.len(), "Collector queue drained");
    Json(packages)
}
