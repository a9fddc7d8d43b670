use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Clock, Outcome, Result, Sample, SampleStore, Status, TelemetryError};

// ─── Request / response types ────────────────────────────────────

/// Raw write request. Every field is optional here so that missing values
/// surface as `InvalidSample` rather than as a body parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default, alias = "exchangeId")]
    pub entity_id: Option<String>,
    #[serde(default, alias = "latency")]
    pub latency_ms: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
    pub status: Status,
}

// ─── Gateway ─────────────────────────────────────────────────────

/// Validates probe writes, appends them and prunes the series.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn SampleStore>,
    clock: Arc<dyn Clock>,
    retention_ms: i64,
}

impl Gateway {
    pub fn new(store: Arc<dyn SampleStore>, clock: Arc<dyn Clock>, retention_ms: i64) -> Self {
        Self {
            store,
            clock,
            retention_ms,
        }
    }

    /// Turn a raw request into a sample, stamping it with "now" when the
    /// caller gave no timestamp.
    pub fn validate(&self, req: IngestRequest) -> Result<Sample> {
        let entity_id = req
            .entity_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TelemetryError::InvalidSample("entityId is required".into()))?;
        let raw = req
            .latency_ms
            .ok_or_else(|| TelemetryError::InvalidSample("latencyMs is required".into()))?;
        let outcome = Outcome::from_wire(raw)?;
        let timestamp = req.timestamp.unwrap_or_else(|| self.clock.now_ms());

        Ok(Sample::new(entity_id, timestamp, outcome))
    }

    pub async fn ingest(&self, req: IngestRequest) -> Result<Ack> {
        let sample = self.validate(req)?;
        let status = sample.status;
        self.append(&sample).await?;
        Ok(Ack {
            success: true,
            status,
        })
    }

    /// Append, then prune everything older than the retention horizon.
    ///
    /// The cutoff is computed from the clock, not from the sample, so a
    /// sample stamped near "now" is never removed by its own prune pass.
    pub async fn append(&self, sample: &Sample) -> Result<()> {
        self.store.append(sample).await?;

        let cutoff = self.clock.now_ms() - self.retention_ms;
        match self.store.prune(&sample.entity_id, cutoff).await {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(entity_id = %sample.entity_id, removed, "pruned expired samples");
            }
            Err(e) => {
                // The append itself landed; the next write retries the prune.
                tracing::warn!(entity_id = %sample.entity_id, error = %e, "prune failed");
            }
        }
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
