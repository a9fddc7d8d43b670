use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::catalog::{Catalog, Entity};
use crate::telemetry::{Clock, Outcome, Sample};

/// Measures one HTTP round trip per entity health endpoint.
///
/// A timeout or any transport error is reported as `Outcome::Failed`,
/// never as an error.
#[derive(Clone)]
pub struct Prober {
    client: reqwest::Client,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl Prober {
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            timeout,
            clock,
        })
    }

    pub async fn probe(&self, entity: &Entity) -> Sample {
        let t0 = Instant::now();
        let result = self.client.get(&entity.endpoint).send().await;
        let elapsed = t0.elapsed();

        let outcome = match result {
            Ok(_) => Outcome::Ok(elapsed.as_millis().min(u32::MAX as u128) as u32),
            Err(e) => {
                tracing::debug!(
                    entity_id = %entity.id,
                    timed_out = e.is_timeout(),
                    limit = ?self.timeout,
                    error = %e,
                    "probe failed"
                );
                Outcome::Failed
            }
        };
        Sample::new(entity.id.clone(), self.clock.now_ms(), outcome)
    }

    /// Probe every entity concurrently, results in catalog order.
    pub async fn probe_all(&self, catalog: &Catalog) -> Vec<Sample> {
        join_all(catalog.iter().map(|e| self.probe(e))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FixedClock, Status};

    #[tokio::test]
    async fn unreachable_endpoint_is_failed_outcome() {
        let prober = Prober::new(Duration::from_millis(500), Arc::new(FixedClock(77))).unwrap();
        let entity = Entity {
            id: "nowhere".into(),
            name: "Nowhere".into(),
            location: "Void".into(),
            provider: "AWS".into(),
            cloud_region: String::new(),
            // Port 9 (discard) on loopback refuses connections.
            endpoint: "http://127.0.0.1:9/ping".into(),
            base_latency_ms: 10,
        };

        let sample = prober.probe(&entity).await;
        assert_eq!(sample.outcome, Outcome::Failed);
        assert_eq!(sample.status, Status::Error);
        assert_eq!(sample.timestamp, 77);
    }
}
