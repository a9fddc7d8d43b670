use axum::{extract::State, Json};
use std::sync::Arc;

use crate::live::LiveAnalytics;
use crate::AppState;

// ─── GET /api/analytics ──────────────────────────────────────────

/// Summary, distribution, rollups and rankings over the latest reading of
/// every entity. Zero-valued when nothing has been reported yet.
pub async fn get_analytics(State(state): State<Arc<AppState>>) -> Json<LiveAnalytics> {
    Json(current(&state).await)
}

pub(crate) async fn current(state: &AppState) -> LiveAnalytics {
    let snapshot = state.live.snapshot().await;
    LiveAnalytics::compute(&snapshot, &state.catalog)
}
