use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;

use super::collector::StoreMetrics;
use crate::handlers::analytics;
use crate::AppState;

// ─── GET /api/metrics ────────────────────────────────────────────
/// Store round-trip percentiles and error counters as one JSON document.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<StoreMetrics> {
    Json(state.metrics.snapshot())
}

// ─── GET /api/analytics/stream ───────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the live analytics document every `stream_interval`.

pub async fn analytics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.stream_interval);

    let stream = IntervalStream::new(interval).then(move |_| {
        let state = state.clone();
        async move {
            let payload = analytics::current(&state).await;
            let json = serde_json::to_string(&payload).unwrap_or_default();
            Ok::<_, Infallible>(Event::default().event("analytics").data(json))
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
