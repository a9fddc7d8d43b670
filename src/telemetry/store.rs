use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Result, Sample, TelemetryError};

// ─── Store contract ──────────────────────────────────────────────

/// Per-entity, timestamp-ordered sample storage.
///
/// Implementations serialize concurrent writers themselves; callers hold
/// no locks across these calls. Samples with equal timestamps are kept
/// in arrival order.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append one sample to its entity's series.
    async fn append(&self, sample: &Sample) -> Result<()>;

    /// Samples with `from_ts <= timestamp <= to_ts`, ascending by timestamp.
    /// An unknown entity yields an empty vec.
    async fn range_query(&self, entity_id: &str, from_ts: i64, to_ts: i64) -> Result<Vec<Sample>>;

    /// Remove samples with `timestamp < older_than`. Returns how many went.
    async fn prune(&self, entity_id: &str, older_than: i64) -> Result<u64>;
}

pub(crate) fn require_entity(entity_id: &str) -> Result<()> {
    if entity_id.trim().is_empty() {
        return Err(TelemetryError::InvalidSample("entityId is required".into()));
    }
    Ok(())
}

// ─── In-process store ────────────────────────────────────────────

/// `SampleStore` kept in process memory. Used for local runs without
/// Redis and by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Keyed by (timestamp, arrival sequence) so ties keep arrival order.
    series: HashMap<String, BTreeMap<(i64, u64), Sample>>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples currently held for `entity_id`.
    pub fn len(&self, entity_id: &str) -> usize {
        self.inner
            .lock()
            .series
            .get(entity_id)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn append(&self, sample: &Sample) -> Result<()> {
        require_entity(&sample.entity_id)?;

        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .series
            .entry(sample.entity_id.clone())
            .or_default()
            .insert((sample.timestamp, seq), sample.clone());
        Ok(())
    }

    async fn range_query(&self, entity_id: &str, from_ts: i64, to_ts: i64) -> Result<Vec<Sample>> {
        if from_ts > to_ts {
            return Ok(Vec::new());
        }
        let inner = self.inner.lock();
        let Some(series) = inner.series.get(entity_id) else {
            return Ok(Vec::new());
        };
        Ok(series
            .range((from_ts, 0)..=(to_ts, u64::MAX))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn prune(&self, entity_id: &str, older_than: i64) -> Result<u64> {
        let mut inner = self.inner.lock();
        let Some(series) = inner.series.get_mut(entity_id) else {
            return Ok(0);
        };
        let kept = series.split_off(&(older_than, 0));
        let removed = series.len() as u64;
        *series = kept;
        Ok(removed)
    }
}
