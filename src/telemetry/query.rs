use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DataPoint, Outcome, Result, Sample, SampleStore, Status, TelemetryError, HOUR_MS};

// ─── Time range tokens ───────────────────────────────────────────

/// Query window token. Anything unrecognised falls back to `24h`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    Hour,
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    pub fn parse(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some("1h") => Self::Hour,
            Some("24h") => Self::Day,
            Some("7d") => Self::Week,
            Some("30d") => Self::Month,
            _ => Self::default(),
        }
    }

    pub fn hours(self) -> i64 {
        match self {
            Self::Hour => 1,
            Self::Day => 24,
            Self::Week => 168,
            Self::Month => 720,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "1h",
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    /// Inclusive `(from, to)` bounds ending at `now_ms`.
    pub fn window(self, now_ms: i64) -> (i64, i64) {
        (now_ms - self.hours() * HOUR_MS, now_ms)
    }
}

// ─── Range query ─────────────────────────────────────────────────

/// Samples for `entity_id` inside `range`, ascending by timestamp.
///
/// An empty result is not an error; the caller decides whether to fall
/// back to synthesis. When `timeout` is set, a slow store is reported as
/// `StoreUnavailable`.
pub async fn query(
    store: &dyn SampleStore,
    entity_id: &str,
    range: TimeRange,
    now_ms: i64,
    timeout: Option<Duration>,
) -> Result<Vec<Sample>> {
    let (from_ts, to_ts) = range.window(now_ms);
    let fetch = store.range_query(entity_id, from_ts, to_ts);

    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
            TelemetryError::StoreUnavailable(format!("range query timed out after {limit:?}"))
        })?,
        None => fetch.await,
    }
}

// ─── Downsampling ────────────────────────────────────────────────

/// Reduce `samples` to at most `max_points` points.
///
/// Samples are split into equal-count buckets in order. Each bucket keeps
/// its first timestamp and the rounded mean of its valid latencies; a
/// bucket with only failed probes stays failed. `max_points == 0` means
/// no limit.
pub fn downsample(samples: &[Sample], max_points: usize) -> Vec<DataPoint> {
    let n = samples.len();
    if max_points == 0 || n <= max_points {
        return samples.iter().map(DataPoint::from).collect();
    }

    (0..max_points)
        .map(|i| {
            let bucket = &samples[i * n / max_points..(i + 1) * n / max_points];
            let (sum, count) = bucket
                .iter()
                .filter_map(|s| s.outcome.latency())
                .fold((0u64, 0u64), |(sum, count), ms| (sum + ms as u64, count + 1));

            let outcome = if count == 0 {
                Outcome::Failed
            } else {
                Outcome::Ok((sum as f64 / count as f64).round() as u32)
            };
            DataPoint {
                timestamp: bucket[0].timestamp,
                latency_ms: outcome,
                status: Status::classify(outcome),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MemoryStore, DAY_MS};
    use async_trait::async_trait;

    #[test]
    fn tokens_map_to_hours() {
        assert_eq!(TimeRange::parse(Some("1h")).hours(), 1);
        assert_eq!(TimeRange::parse(Some("24h")).hours(), 24);
        assert_eq!(TimeRange::parse(Some("7d")).hours(), 168);
        assert_eq!(TimeRange::parse(Some("30d")).hours(), 720);
        assert_eq!(TimeRange::parse(Some("90d")), TimeRange::Day);
        assert_eq!(TimeRange::parse(None), TimeRange::Day);
    }

    #[tokio::test]
    async fn day_window_excludes_outside_samples() {
        let now = 100 * DAY_MS;
        let store = MemoryStore::new();
        let stamps = [
            now - DAY_MS - 1,
            now - DAY_MS,
            now - HOUR_MS,
            now,
            now + 1,
        ];
        for ts in stamps {
            store.append(&Sample::new("x", ts, Outcome::Ok(10))).await.unwrap();
        }

        let got = query(&store, "x", TimeRange::Day, now, None).await.unwrap();
        let ts: Vec<i64> = got.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![now - DAY_MS, now - HOUR_MS, now]);
        assert!(got.iter().all(|s| s.timestamp >= now - DAY_MS && s.timestamp <= now));
    }

    struct StalledStore;

    #[async_trait]
    impl SampleStore for StalledStore {
        async fn append(&self, _: &Sample) -> Result<()> {
            Ok(())
        }
        async fn range_query(&self, _: &str, _: i64, _: i64) -> Result<Vec<Sample>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        async fn prune(&self, _: &str, _: i64) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let err = query(
            &StalledStore,
            "x",
            TimeRange::Hour,
            0,
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TelemetryError::StoreUnavailable(_)));
    }

    #[test]
    fn downsample_buckets_by_count() {
        let samples: Vec<Sample> = (0..10)
            .map(|i| {
                let outcome = if i == 9 { Outcome::Failed } else { Outcome::Ok(i * 10) };
                Sample::new("x", i as i64 * 1_000, outcome)
            })
            .collect();

        let points = downsample(&samples, 5);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].timestamp, 0);
        assert_eq!(points[0].latency_ms, Outcome::Ok(5));
        assert_eq!(points[4].timestamp, 8_000);
        // bucket [80, failed] keeps only the valid latency
        assert_eq!(points[4].latency_ms, Outcome::Ok(80));

        assert_eq!(downsample(&samples, 0).len(), 10);
        assert_eq!(downsample(&samples, 50).len(), 10);
    }
}
