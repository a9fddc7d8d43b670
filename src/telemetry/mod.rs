pub mod aggregate;
pub mod ingest;
pub mod query;
pub mod redis_store;
pub mod store;
pub mod synthetic;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use store::{MemoryStore, SampleStore};

// ─── Time constants ──────────────────────────────────────────────

pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Samples older than this are eligible for pruning.
pub const DEFAULT_RETENTION_MS: i64 = 30 * DAY_MS;

/// Status thresholds (ms), applied with `>`.
const WARNING_ABOVE_MS: u32 = 200;
const MEDIUM_ABOVE_MS: u32 = 100;

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Client input defect: missing entity id, missing or malformed latency.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// Aggregation requested over a set with no valid latencies.
    #[error("no valid samples to aggregate")]
    NoData,

    /// Backing store I/O failure or timeout.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

// ─── Outcome ─────────────────────────────────────────────────────

/// Result of one probe. On the wire this is a signed `latencyMs`
/// where `-1` stands for `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok(u32),
    Failed,
}

impl Outcome {
    pub const FAILED_SENTINEL: i64 = -1;

    /// Decode the wire representation. Any negative value other than the
    /// sentinel is rejected.
    pub fn from_wire(value: i64) -> Result<Self> {
        match value {
            Self::FAILED_SENTINEL => Ok(Self::Failed),
            v if v < 0 => Err(TelemetryError::InvalidSample(format!(
                "latencyMs must be >= 0 or -1, got {v}"
            ))),
            v => u32::try_from(v).map(Self::Ok).map_err(|_| {
                TelemetryError::InvalidSample(format!("latencyMs out of range: {v}"))
            }),
        }
    }

    pub fn to_wire(self) -> i64 {
        match self {
            Self::Ok(ms) => ms as i64,
            Self::Failed => Self::FAILED_SENTINEL,
        }
    }

    /// The latency when the probe succeeded.
    pub fn latency(self) -> Option<u32> {
        match self {
            Self::Ok(ms) => Some(ms),
            Self::Failed => None,
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_i64(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = i64::deserialize(d)?;
        Self::from_wire(raw).map_err(serde::de::Error::custom)
    }
}

// ─── Status ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Medium,
    Warning,
    Error,
}

impl Status {
    /// Write-time classification shared by every ingestion path.
    pub fn classify(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Failed => Self::Error,
            Outcome::Ok(ms) if ms > WARNING_ABOVE_MS => Self::Warning,
            Outcome::Ok(ms) if ms > MEDIUM_ABOVE_MS => Self::Medium,
            Outcome::Ok(_) => Self::Success,
        }
    }
}

// ─── Sample ──────────────────────────────────────────────────────

/// One latency observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub entity_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "latencyMs")]
    pub outcome: Outcome,
    pub status: Status,
}

impl Sample {
    /// Build a sample with its status derived from the outcome.
    pub fn new(entity_id: impl Into<String>, timestamp: i64, outcome: Outcome) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            outcome,
            status: Status::classify(outcome),
        }
    }
}

/// A sample without its entity id, as it appears inside a series response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub timestamp: i64,
    #[serde(alias = "latency")]
    pub latency_ms: Outcome,
    pub status: Status,
}

impl From<&Sample> for DataPoint {
    fn from(s: &Sample) -> Self {
        Self {
            timestamp: s.timestamp,
            latency_ms: s.outcome,
            status: s.status,
        }
    }
}

/// Series for one entity plus its lightweight stats. Produced from stored
/// samples or, when none are usable, by the synthetic generator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub entity_id: String,
    pub data: Vec<DataPoint>,
    pub stats: aggregate::BasicStats,
    /// True when `data` was fabricated rather than read from the store.
    pub synthetic: bool,
}

// ─── Clock ───────────────────────────────────────────────────────

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock pinned to one instant. Used by tests and replay tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_thresholds() {
        assert_eq!(Status::classify(Outcome::Ok(250)), Status::Warning);
        assert_eq!(Status::classify(Outcome::Ok(201)), Status::Warning);
        assert_eq!(Status::classify(Outcome::Ok(200)), Status::Medium);
        assert_eq!(Status::classify(Outcome::Ok(150)), Status::Medium);
        assert_eq!(Status::classify(Outcome::Ok(101)), Status::Medium);
        assert_eq!(Status::classify(Outcome::Ok(100)), Status::Success);
        assert_eq!(Status::classify(Outcome::Ok(80)), Status::Success);
        assert_eq!(Status::classify(Outcome::Failed), Status::Error);
    }

    #[test]
    fn outcome_wire_sentinel() {
        assert_eq!(Outcome::from_wire(-1).unwrap(), Outcome::Failed);
        assert_eq!(Outcome::from_wire(0).unwrap(), Outcome::Ok(0));
        assert!(matches!(
            Outcome::from_wire(-5),
            Err(TelemetryError::InvalidSample(_))
        ));
        assert_eq!(Outcome::Failed.to_wire(), -1);
    }

    #[test]
    fn sample_json_shape() {
        let s = Sample::new("binance-tokyo", 1_700_000_000_000, Outcome::Ok(42));
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["entityId"], "binance-tokyo");
        assert_eq!(v["latencyMs"], 42);
        assert_eq!(v["status"], "success");

        let failed: Sample = serde_json::from_value(serde_json::json!({
            "entityId": "x",
            "timestamp": 1,
            "latencyMs": -1,
            "status": "error",
        }))
        .unwrap();
        assert_eq!(failed.outcome, Outcome::Failed);
    }
}
