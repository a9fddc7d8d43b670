use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::sync::Semaphore;

use crate::catalog::Catalog;
use crate::metrics::{MetricsCollector, StoreCall, StoreOp};
use crate::telemetry::ingest::Gateway;
use crate::telemetry::{Outcome, Sample};

// ─── Constants ───────────────────────────────────────────────────

/// Jitter band as a fraction of the base latency (±half of this).
const VARIATION: f64 = 0.2;
const SPIKE_PROBABILITY: f64 = 0.05;
/// Spike size as a fraction of the base latency.
const SPIKE: f64 = 0.5;
const FAILURE_PROBABILITY: f64 = 0.05;

// ─── Batch generation ────────────────────────────────────────────

/// Base latency plus uniform jitter, with an occasional spike.
pub fn realistic_latency<R: Rng>(base_ms: u32, rng: &mut R) -> u32 {
    let base = base_ms as f64;
    let jitter = (rng.gen::<f64>() - 0.5) * base * VARIATION;
    let spike = if rng.gen_bool(SPIKE_PROBABILITY) {
        base * SPIKE
    } else {
        0.0
    };
    (base + jitter + spike).round().max(0.0) as u32
}

/// One fresh reading per catalog entity, all stamped `now_ms`. About one
/// in twenty comes back as a failed probe.
pub fn generate_batch<R: Rng>(catalog: &Catalog, now_ms: i64, rng: &mut R) -> Vec<Sample> {
    catalog
        .iter()
        .map(|entity| {
            let outcome = if rng.gen_bool(FAILURE_PROBABILITY) {
                Outcome::Failed
            } else {
                Outcome::Ok(realistic_latency(entity.base_latency_ms, rng))
            };
            Sample::new(entity.id.clone(), now_ms, outcome)
        })
        .collect()
}

// ─── Fan-out writes ──────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub failed: usize,
    /// Failed probes are not persisted.
    pub skipped: usize,
}

/// Write every successful reading through the gateway, one task per
/// entity, at most `concurrency` in flight. A failing entity is logged and
/// counted; it never stops the others.
pub async fn write_batch(
    gateway: Gateway,
    batch: Vec<Sample>,
    concurrency: usize,
    metrics: Arc<MetricsCollector>,
) -> WriteReport {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut report = WriteReport::default();
    let mut handles = Vec::with_capacity(batch.len());

    for sample in batch {
        if sample.outcome == Outcome::Failed {
            report.skipped += 1;
            continue;
        }

        let gateway = gateway.clone();
        let permits = permits.clone();
        let metrics = metrics.clone();

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();

            let t0 = Instant::now();
            let result = gateway.append(&sample).await;
            metrics.record(StoreCall {
                op: StoreOp::Write,
                micros: t0.elapsed().as_micros() as u64,
                success: result.is_ok(),
            });

            if let Err(e) = &result {
                tracing::error!(entity_id = %sample.entity_id, error = %e, "mock sample write failed");
            }
            result.is_ok()
        }));
    }

    for h in handles {
        match h.await {
            Ok(true) => report.written += 1,
            Ok(false) => report.failed += 1,
            Err(e) => {
                tracing::error!(error = %e, "mock write task panicked");
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{
        FixedClock, MemoryStore, Result, SampleStore, TelemetryError, DEFAULT_RETENTION_MS,
    };
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn latency_stays_near_base() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let ms = realistic_latency(100, &mut rng);
            // jitter ±10, spike +50
            assert!((90..=160).contains(&ms), "{ms}");
        }
    }

    #[test]
    fn batch_covers_catalog() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(11);
        let batch = generate_batch(&catalog, 1_234, &mut rng);

        assert_eq!(batch.len(), catalog.len());
        assert!(batch.iter().all(|s| s.timestamp == 1_234));
        let ids: Vec<_> = batch.iter().map(|s| s.entity_id.as_str()).collect();
        let want: Vec<_> = catalog.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, want);
    }

    /// Fails writes for one entity, delegates the rest.
    struct FlakyStore {
        inner: MemoryStore,
        broken: &'static str,
    }

    #[async_trait]
    impl SampleStore for FlakyStore {
        async fn append(&self, sample: &Sample) -> Result<()> {
            if sample.entity_id == self.broken {
                return Err(TelemetryError::StoreUnavailable("connection reset".into()));
            }
            self.inner.append(sample).await
        }
        async fn range_query(&self, id: &str, from: i64, to: i64) -> Result<Vec<Sample>> {
            self.inner.range_query(id, from, to).await
        }
        async fn prune(&self, id: &str, older_than: i64) -> Result<u64> {
            self.inner.prune(id, older_than).await
        }
    }

    #[tokio::test]
    async fn one_failing_entity_does_not_fail_the_batch() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            broken: "b",
        });
        let gateway = Gateway::new(store.clone(), Arc::new(FixedClock(1_000)), DEFAULT_RETENTION_MS);
        let metrics = Arc::new(MetricsCollector::new());

        let batch = vec![
            Sample::new("a", 1_000, Outcome::Ok(10)),
            Sample::new("b", 1_000, Outcome::Ok(20)),
            Sample::new("c", 1_000, Outcome::Failed),
            Sample::new("d", 1_000, Outcome::Ok(30)),
        ];
        let report = write_batch(gateway, batch, 2, metrics.clone()).await;

        assert_eq!(
            report,
            WriteReport {
                written: 2,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(store.inner.len("a"), 1);
        assert_eq!(store.inner.len("d"), 1);
        assert_eq!(store.inner.len("c"), 0);
        assert_eq!(metrics.snapshot().write_errors, 1);
    }
}
