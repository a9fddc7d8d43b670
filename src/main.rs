use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use latency_telemetry::config::{Config, StoreBackend};
use latency_telemetry::telemetry::redis_store::RedisStore;
use latency_telemetry::telemetry::{MemoryStore, SampleStore, SystemClock};
use latency_telemetry::{server, AppState};

/// Latency telemetry collection and analytics service.
#[derive(Parser)]
#[command(name = "latency-telemetry", version, about)]
struct Cli {
    /// Path to the YAML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    // ── 1. Load configuration ────────────────────────────────────
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }

    // ── 2. Open the sample store ─────────────────────────────────
    let store: Arc<dyn SampleStore> = match cfg.store.backend {
        StoreBackend::Redis => {
            tracing::info!(url = %cfg.store.redis_url, "connecting to redis");
            let redis = RedisStore::connect(&cfg.store.redis_url, cfg.retention_ms())
                .await
                .context("cannot connect to redis (is redis-server running?)")?;
            Arc::new(redis)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory sample store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // ── 3. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new(&cfg, store, Arc::new(SystemClock))?);
    tracing::info!(
        entities = state.catalog.len(),
        retention = ?cfg.retention,
        "telemetry engine ready"
    );

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    tracing::info!(addr = %cfg.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("received SIGINT, shutting down");
}
