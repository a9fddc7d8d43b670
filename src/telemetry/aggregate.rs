//! Summary statistics over latency sets.
//!
//! Everything here is pure and synchronous: callers fetch samples first,
//! then aggregate. Failed probes never reach these functions, use
//! [`valid_latencies`] to strip them.
//!
//! Percentiles use the nearest-rank rule `sorted[floor(n * q)]` with no
//! interpolation. Downstream charts depend on these exact boundaries.

use std::collections::HashMap;

use serde::Serialize;

use super::{Result, Sample, TelemetryError};

// ─── Distribution thresholds (ms) ────────────────────────────────

const EXCELLENT_BELOW: u32 = 50;
const GOOD_BELOW: u32 = 100;
const MODERATE_BELOW: u32 = 200;

// ─── Summary types ───────────────────────────────────────────────

/// Lightweight `{min, max, avg}` form, avg rounded to whole ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BasicStats {
    pub min: u32,
    pub max: u32,
    pub avg: u32,
}

impl BasicStats {
    pub const ZERO: Self = Self {
        min: 0,
        max: 0,
        avg: 0,
    };
}

/// Extended form used by the analytics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub min: u32,
    pub max: u32,
    pub avg: f64,
    pub median: u32,
    pub p25: u32,
    pub p75: u32,
    pub p95: u32,
    pub std_dev: f64,
    /// Population variance.
    pub variance: f64,
    pub count: usize,
}

impl Summary {
    /// Placeholder for live views over an empty snapshot.
    pub fn zero() -> Self {
        Self {
            min: 0,
            max: 0,
            avg: 0.0,
            median: 0,
            p25: 0,
            p75: 0,
            p95: 0,
            std_dev: 0.0,
            variance: 0.0,
            count: 0,
        }
    }

    pub fn basic(&self) -> BasicStats {
        BasicStats {
            min: self.min,
            max: self.max,
            avg: self.avg.round() as u32,
        }
    }
}

/// Latencies of the samples whose probe succeeded, in input order.
pub fn valid_latencies<'a, I>(samples: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Sample>,
{
    samples
        .into_iter()
        .filter_map(|s| s.outcome.latency())
        .collect()
}

/// Full statistics over a set of valid latencies.
pub fn summarize(latencies: &[u32]) -> Result<Summary> {
    if latencies.is_empty() {
        return Err(TelemetryError::NoData);
    }

    // One sort, reused for every order statistic.
    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let rank = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];

    let avg = mean(&sorted);
    let variance = sorted
        .iter()
        .map(|&x| {
            let d = x as f64 - avg;
            d * d
        })
        .sum::<f64>()
        / n as f64;

    Ok(Summary {
        min: sorted[0],
        max: sorted[n - 1],
        avg,
        median: sorted[n / 2],
        p25: rank(0.25),
        p75: rank(0.75),
        p95: rank(0.95),
        std_dev: variance.sqrt(),
        variance,
        count: n,
    })
}

/// `{min, max, avg}` only. Same computation as [`summarize`].
pub fn summarize_basic(latencies: &[u32]) -> Result<BasicStats> {
    summarize(latencies).map(|s| s.basic())
}

fn mean(values: &[u32]) -> f64 {
    values.iter().map(|&v| v as u64).sum::<u64>() as f64 / values.len() as f64
}

// ─── Distribution buckets ────────────────────────────────────────

/// Counts per latency band: `<50`, `50..100`, `100..200`, `>=200`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub excellent: usize,
    pub good: usize,
    pub moderate: usize,
    pub poor: usize,
}

/// One named band, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Band {
    pub name: &'static str,
    pub label: &'static str,
    pub count: usize,
}

impl Distribution {
    pub fn from_latencies(latencies: &[u32]) -> Self {
        let mut d = Self::default();
        for &ms in latencies {
            match ms {
                ms if ms < EXCELLENT_BELOW => d.excellent += 1,
                ms if ms < GOOD_BELOW => d.good += 1,
                ms if ms < MODERATE_BELOW => d.moderate += 1,
                _ => d.poor += 1,
            }
        }
        d
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.moderate + self.poor
    }

    /// Bands with a non-zero count, in threshold order.
    pub fn bands(&self) -> Vec<Band> {
        [
            ("excellent", "Excellent (<50ms)", self.excellent),
            ("good", "Good (50-100ms)", self.good),
            ("moderate", "Moderate (100-200ms)", self.moderate),
            ("poor", "Poor (>200ms)", self.poor),
        ]
        .into_iter()
        .filter(|&(_, _, count)| count > 0)
        .map(|(name, label, count)| Band { name, label, count })
        .collect()
    }
}

// ─── Group-by rollups ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub min: u32,
    pub max: u32,
    pub avg: u32,
    pub count: usize,
}

/// Partition valid samples by an external dimension and summarize each
/// group. `dimension` maps an entity id to its group; unmapped entities are
/// skipped. Groups come back in first-seen order.
pub fn rollup<F>(samples: &[Sample], mut dimension: F) -> Vec<GroupStats>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<u32>)> = Vec::new();

    for sample in samples {
        let Some(ms) = sample.outcome.latency() else {
            continue;
        };
        let Some(key) = dimension(&sample.entity_id) else {
            continue;
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(ms);
    }

    groups
        .into_iter()
        .filter_map(|(key, values)| {
            let stats = summarize_basic(&values).ok()?;
            Some(GroupStats {
                key,
                min: stats.min,
                max: stats.max,
                avg: stats.avg,
                count: values.len(),
            })
        })
        .collect()
}

/// Rollup keyed by [`region_of`] the entity's location label, ascending by
/// average latency.
pub fn rollup_by_region<F>(samples: &[Sample], mut location_of: F) -> Vec<GroupStats>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut groups = rollup(samples, |id| {
        location_of(id).map(|loc| region_of(&loc).to_owned())
    });
    groups.sort_by_key(|g| g.avg);
    groups
}

/// Region part of a `"City, Country"` label: the trimmed text after the
/// first comma, or the whole label when that is missing or blank.
pub fn region_of(location: &str) -> &str {
    location
        .split(',')
        .nth(1)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(location)
}

// ─── Ranking ─────────────────────────────────────────────────────

/// The `n` fastest valid samples, ascending. Ties keep input order.
pub fn top_n(samples: &[Sample], n: usize) -> Vec<&Sample> {
    let mut valid: Vec<&Sample> = samples
        .iter()
        .filter(|s| s.outcome.latency().is_some())
        .collect();
    // sort_by_key is stable.
    valid.sort_by_key(|s| s.outcome.latency());
    valid.truncate(n);
    valid
}
