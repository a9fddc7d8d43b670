use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

pub mod catalog;
pub mod config;
pub mod handlers;
pub mod live;
pub mod metrics;
pub mod middleware;
pub mod mock_data;
pub mod probe;
pub mod server;
pub mod telemetry;

use telemetry::ingest::Gateway;
use telemetry::{Clock, SampleStore};

/// Live-owner channel depth; producers wait when it is full.
const LIVE_CHANNEL_CAPACITY: usize = 256;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Validates and persists samples; also carries the store and clock.
    pub gateway: Gateway,

    /// Monitored entities and their metadata.
    pub catalog: Arc<catalog::Catalog>,

    /// Handle to the task owning the latest reading per entity.
    pub live: live::LiveTelemetry,

    /// Outbound health-endpoint prober.
    pub prober: probe::Prober,

    /// Store call timings, read by `/api/metrics`.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// Deadline applied to range queries on the read path.
    pub store_timeout: Duration,

    /// Max in-flight store writes per mock batch.
    pub mock_write_concurrency: usize,

    /// Push interval of the analytics SSE stream.
    pub stream_interval: Duration,
}

impl AppState {
    /// Build state around an already-opened store. Must run inside a Tokio
    /// runtime since it starts the live telemetry owner.
    pub fn new(
        cfg: &config::Config,
        store: Arc<dyn SampleStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let prober = probe::Prober::new(cfg.probe.timeout, clock.clone())
            .context("building probe HTTP client")?;
        let (live, _owner) = live::LiveTelemetry::spawn(LIVE_CHANNEL_CAPACITY);

        Ok(Self {
            gateway: Gateway::new(store, clock, cfg.retention_ms()),
            catalog: Arc::new(cfg.build_catalog()),
            live,
            prober,
            metrics: Arc::new(metrics::MetricsCollector::new()),
            store_timeout: cfg.store.timeout,
            mock_write_concurrency: cfg.mock.write_concurrency,
            stream_interval: cfg.stream_interval,
        })
    }

    pub fn now_ms(&self) -> i64 {
        self.gateway.clock().now_ms()
    }
}
