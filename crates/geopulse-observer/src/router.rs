//! Axum router construction for the observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/dashboard` -- `WebSocket` frame and report stream
/// - `GET /api/scene`, `/api/chart`, `/api/top`, `/api/stats`,
///   `/api/style` -- dashboard reads
/// - `GET|POST /api/package` -- collector intake
/// - `GET /api/get_packages` -- collector drain
///
/// CORS allows any origin, matching the browser front-end and the
/// collector it replaces.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/dashboard", get(ws::ws_dashboard))
        // Dashboard API
        .route("/api/scene", get(handlers::get_scene))
        .route("/api/chart", get(handlers::get_chart))
        .route("/api/top", get(handlers::get_top))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/style", get(handlers::get_style))
        // Collector
        .route(
            "/api/package",
            get(handlers::receive_package).post(handlers::receive_package),
        )
        .route("/api/get_packages", get(handlers::get_packages))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
