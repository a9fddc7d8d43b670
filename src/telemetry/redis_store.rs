use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::store::require_entity;
use super::{DataPoint, Result, Sample, SampleStore, TelemetryError};

impl From<redis::RedisError> for TelemetryError {
    fn from(e: redis::RedisError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

// ─── Key layout ──────────────────────────────────────────────────
//
//   latency:{entityId}       ZSET  score = timestamp ms
//                                  member = "{seq:020}:{json DataPoint}"
//   latency:{entityId}:seq   STRING arrival counter for the series
//
// Zero-padded sequence prefixes make equal-score members sort by arrival
// and keep byte-identical samples from collapsing into one member.

fn series_key(entity_id: &str) -> String {
    format!("latency:{entity_id}")
}

fn seq_key(entity_id: &str) -> String {
    format!("latency:{entity_id}:seq")
}

fn encode_member(seq: u64, point: &DataPoint) -> Result<String> {
    let json = serde_json::to_string(point)
        .map_err(|e| TelemetryError::StoreUnavailable(format!("encode sample: {e}")))?;
    Ok(format!("{seq:020}:{json}"))
}

/// Members written before sequence prefixes existed are bare JSON.
fn decode_member(entity_id: &str, raw: &str) -> Option<Sample> {
    let json = match raw.split_once(':') {
        Some((seq, rest)) if !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()) => rest,
        _ => raw,
    };
    let point: DataPoint = serde_json::from_str(json).ok()?;
    Some(Sample {
        entity_id: entity_id.to_owned(),
        timestamp: point.timestamp,
        outcome: point.latency_ms,
        status: point.status,
    })
}

// ─── Store ───────────────────────────────────────────────────────

/// `SampleStore` backed by one Redis sorted set per entity.
///
/// `ConnectionManager` is cheaply cloneable and every clone shares the same
/// multiplexed connection, so each call clones it rather than locking.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    retention_secs: i64,
}

impl RedisStore {
    /// Open a connection manager that reconnects on failure.
    pub async fn connect(url: &str, retention_ms: i64) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            retention_secs: (retention_ms / 1000).max(1),
        })
    }
}

#[async_trait]
impl SampleStore for RedisStore {
    async fn append(&self, sample: &Sample) -> Result<()> {
        require_entity(&sample.entity_id)?;

        let key = series_key(&sample.entity_id);
        let seq_key = seq_key(&sample.entity_id);
        let mut conn = self.conn.clone();

        let seq: u64 = redis::cmd("INCR")
            .arg(&seq_key)
            .query_async(&mut conn)
            .await?;
        let member = encode_member(seq, &DataPoint::from(sample))?;

        // Whole-series expiry is refreshed on every write.
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("ZADD")
            .arg(&key)
            .arg(sample.timestamp)
            .arg(&member)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.retention_secs)
            .ignore()
            .cmd("EXPIRE")
            .arg(&seq_key)
            .arg(self.retention_secs)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn range_query(&self, entity_id: &str, from_ts: i64, to_ts: i64) -> Result<Vec<Sample>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(series_key(entity_id))
            .arg(from_ts)
            .arg(to_ts)
            .query_async(&mut conn)
            .await?;

        let total = raw.len();
        let samples: Vec<Sample> = raw
            .iter()
            .filter_map(|m| decode_member(entity_id, m))
            .collect();
        if samples.len() < total {
            tracing::warn!(
                entity_id,
                skipped = total - samples.len(),
                "skipped undecodable series members"
            );
        }
        Ok(samples)
    }

    async fn prune(&self, entity_id: &str, older_than: i64) -> Result<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("ZREMRANGEBYSCORE")
            .arg(series_key(entity_id))
            .arg("-inf")
            .arg(format!("({older_than}"))
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }
}
