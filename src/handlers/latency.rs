use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::mock_data;
use crate::AppState;

use super::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyParams {
    #[serde(default, alias = "exchangeId")]
    pub entity_id: Option<String>,
}

// ─── GET /api/latency ────────────────────────────────────────────

/// Live probe of one entity (`?entityId=`) or of the whole catalog.
pub async fn get_latency(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatencyParams>,
) -> Result<Response, AppError> {
    if let Some(id) = params.entity_id.filter(|id| !id.is_empty()) {
        let entity = state
            .catalog
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("entity '{id}' not found")))?;

        let reading = state.prober.probe(entity).await;
        state.live.publish(vec![reading.clone()]).await;
        return Ok(Json(reading).into_response());
    }

    let readings = state.prober.probe_all(&state.catalog).await;
    state.live.publish(readings.clone()).await;
    Ok(Json(readings).into_response())
}

// ─── GET /api/latency/mock ───────────────────────────────────────

/// One fresh mock reading per entity. The batch is returned right away;
/// persisting it runs in a background task whose per-entity failures are
/// only logged.
pub async fn get_mock_latency(State(state): State<Arc<AppState>>) -> Response {
    let now = state.now_ms();
    let batch = mock_data::generate_batch(&state.catalog, now, &mut rand::thread_rng());

    state.live.publish(batch.clone()).await;

    let gateway = state.gateway.clone();
    let metrics = state.metrics.clone();
    let concurrency = state.mock_write_concurrency;
    let to_write = batch.clone();
    tokio::spawn(async move {
        let report = mock_data::write_batch(gateway, to_write, concurrency, metrics).await;
        tracing::debug!(
            written = report.written,
            failed = report.failed,
            skipped = report.skipped,
            "mock batch persisted"
        );
    });

    Json(batch).into_response()
}
