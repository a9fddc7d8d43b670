use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Historical series: read (with fallback) and ingest ──
        .route(
            "/api/historical",
            get(handlers::historical::get_historical).post(handlers::historical::post_historical),
        )
        // ── Live readings ───────────────────────────────────────
        .route("/api/latency", get(handlers::latency::get_latency))
        .route("/api/latency/mock", get(handlers::latency::get_mock_latency))
        // ── Analytics ───────────────────────────────────────────
        .route("/api/analytics", get(handlers::analytics::get_analytics))
        .route("/api/analytics/stream", get(stream::analytics_stream))
        // ── Store metrics ───────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
