use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::PercentileSet;
use super::{StoreCall, StoreOp};

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe record of how the backing store is behaving.
/// Handlers and background writers call `record()`, `/api/metrics` reads
/// `snapshot()`.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreMetrics {
    pub store_read: PercentileSet,
    pub store_write: PercentileSet,
    pub read_errors: u64,
    pub write_errors: u64,
    /// Range queries answered with synthetic data.
    pub synthetic_fallbacks: u64,
    pub uptime_secs: f64,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    read_hist: Histogram<u64>,
    write_hist: Histogram<u64>,
    read_errors: u64,
    write_errors: u64,
    synthetic_fallbacks: u64,
    started: Instant,
}

fn new_histogram() -> Histogram<u64> {
    Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        .expect("static histogram bounds are valid")
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                read_hist: new_histogram(),
                write_hist: new_histogram(),
                read_errors: 0,
                write_errors: 0,
                synthetic_fallbacks: 0,
                started: Instant::now(),
            }),
        }
    }

    pub fn record(&self, call: StoreCall) {
        let mut inner = self.inner.lock();
        // Clamp to the histogram's range instead of dropping outliers.
        let micros = call.micros.clamp(HIST_LOW, HIST_HIGH);

        match call.op {
            StoreOp::Read => {
                let _ = inner.read_hist.record(micros);
                if !call.success {
                    inner.read_errors += 1;
                }
            }
            StoreOp::Write => {
                let _ = inner.write_hist.record(micros);
                if !call.success {
                    inner.write_errors += 1;
                }
            }
        }
    }

    pub fn record_fallback(&self) {
        self.inner.lock().synthetic_fallbacks += 1;
    }

    pub fn snapshot(&self) -> StoreMetrics {
        let inner = self.inner.lock();
        StoreMetrics {
            store_read: PercentileSet::from_histogram(&inner.read_hist),
            store_write: PercentileSet::from_histogram(&inner.write_hist),
            read_errors: inner.read_errors,
            write_errors: inner.write_errors,
            synthetic_fallbacks: inner.synthetic_fallbacks,
            uptime_secs: inner.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
