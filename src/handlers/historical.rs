use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{StoreCall, StoreOp};
use crate::telemetry::aggregate::{summarize_basic, valid_latencies};
use crate::telemetry::ingest::{Ack, IngestRequest};
use crate::telemetry::query::{self, downsample, TimeRange};
use crate::telemetry::{synthetic, SeriesReport, TelemetryError};
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalParams {
    #[serde(default, alias = "exchangeId")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub time_range: Option<String>,
    /// Downsample to at most this many points (0 or absent: no limit).
    #[serde(default)]
    pub max_points: Option<usize>,
}

// ─── GET /api/historical ─────────────────────────────────────────

/// Stored series plus `{min, max, avg}`. Never fails once the entity id is
/// present: no data, all-failed data, or a store error all degrade to a
/// synthetic series.
pub async fn get_historical(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> Result<Json<SeriesReport>, AppError> {
    let entity_id = params
        .entity_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("entityId required".into()))?;
    let range = TimeRange::parse(params.time_range.as_deref());
    let now = state.now_ms();

    // ── Store READ ──────────────────────────────────────────────
    let t_store = Instant::now();
    let fetched = query::query(
        state.gateway.store().as_ref(),
        &entity_id,
        range,
        now,
        Some(state.store_timeout),
    )
    .await;
    state.metrics.record(StoreCall {
        op: StoreOp::Read,
        micros: t_store.elapsed().as_micros() as u64,
        success: fetched.is_ok(),
    });
    // ────────────────────────────────────────────────────────────

    let samples = match fetched {
        Ok(samples) => samples,
        Err(e) => {
            tracing::warn!(%entity_id, error = %e, "historical read failed, serving synthetic data");
            return Ok(Json(fallback(&state, &entity_id, range, now)));
        }
    };

    match summarize_basic(&valid_latencies(&samples)) {
        Ok(stats) => Ok(Json(SeriesReport {
            entity_id,
            data: downsample(&samples, params.max_points.unwrap_or(0)),
            stats,
            synthetic: false,
        })),
        Err(TelemetryError::NoData) => {
            tracing::debug!(%entity_id, range = range.as_str(), "no usable samples, serving synthetic data");
            Ok(Json(fallback(&state, &entity_id, range, now)))
        }
        Err(e) => Err(e.into()),
    }
}

fn fallback(state: &AppState, entity_id: &str, range: TimeRange, now: i64) -> SeriesReport {
    state.metrics.record_fallback();
    synthetic::generate(entity_id, range.hours(), now, &mut rand::thread_rng())
}

// ─── POST /api/historical ────────────────────────────────────────

pub async fn post_historical(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(format!("invalid data: {e}")))?;

    // Validation happens before any store work, so a bad request never
    // shows up as a failed write.
    let sample = state.gateway.validate(req)?;

    // ── Store WRITE ─────────────────────────────────────────────
    let t_store = Instant::now();
    let result = state.gateway.append(&sample).await;
    state.metrics.record(StoreCall {
        op: StoreOp::Write,
        micros: t_store.elapsed().as_micros() as u64,
        success: result.is_ok(),
    });
    // ────────────────────────────────────────────────────────────

    if let Err(e) = result {
        tracing::error!(entity_id = %sample.entity_id, error = %e, "storing latency sample failed");
        return Err(e.into());
    }

    Ok(Json(Ack {
        success: true,
        status: sample.status,
    }))
}
