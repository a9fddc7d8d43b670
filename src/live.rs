//! Latest reading per entity, owned by a single task.
//!
//! Producers (mock batches, live probes) send readings over a channel;
//! readers ask the owner for a snapshot and aggregate it themselves. No
//! lock is shared between requests.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::telemetry::aggregate::{
    rollup, rollup_by_region, summarize, top_n, valid_latencies, Band, Distribution, GroupStats,
    Summary,
};
use crate::telemetry::{Sample, Status, TelemetryError};

const FASTEST_N: usize = 5;
const RANKING_N: usize = 10;

// ─── Owner task ──────────────────────────────────────────────────

enum Command {
    Publish(Vec<Sample>),
    Snapshot(oneshot::Sender<Vec<Sample>>),
}

/// Cloneable handle to the live telemetry owner.
#[derive(Clone)]
pub struct LiveTelemetry {
    tx: mpsc::Sender<Command>,
}

impl LiveTelemetry {
    /// Start the owner task. It stops once every handle is dropped.
    pub fn spawn(capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_owner(rx));
        (Self { tx }, handle)
    }

    /// Replace each entity's reading with the given one when it is not older.
    pub async fn publish(&self, readings: Vec<Sample>) {
        if readings.is_empty() {
            return;
        }
        if self.tx.send(Command::Publish(readings)).await.is_err() {
            tracing::warn!("live telemetry owner is gone, dropping readings");
        }
    }

    /// Latest reading of every entity seen so far, ordered by entity id.
    pub async fn snapshot(&self) -> Vec<Sample> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Snapshot(reply)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

async fn run_owner(mut rx: mpsc::Receiver<Command>) {
    let mut latest: HashMap<String, Sample> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Publish(readings) => {
                for reading in readings {
                    match latest.get(&reading.entity_id) {
                        Some(prev) if prev.timestamp > reading.timestamp => {}
                        _ => {
                            latest.insert(reading.entity_id.clone(), reading);
                        }
                    }
                }
            }
            Command::Snapshot(reply) => {
                let mut snap: Vec<Sample> = latest.values().cloned().collect();
                snap.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
                // Receiver may have given up; nothing to do then.
                let _ = reply.send(snap);
            }
        }
    }
    tracing::debug!("live telemetry owner stopped");
}

// ─── Analytics over a snapshot ───────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    pub entity_id: String,
    pub name: String,
    pub location: String,
    pub provider: String,
    pub latency_ms: u32,
    pub status: Status,
}

/// Everything the analytics view renders, computed from one snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAnalytics {
    pub overall: Summary,
    pub distribution: Distribution,
    pub bands: Vec<Band>,
    pub by_provider: Vec<GroupStats>,
    pub by_region: Vec<GroupStats>,
    pub fastest: Vec<RankedEntity>,
    pub ranking: Vec<RankedEntity>,
    /// Entities with a successful latest reading.
    pub active: usize,
    /// Entities in the catalog.
    pub total: usize,
}

impl LiveAnalytics {
    /// Aggregate a snapshot. An empty or all-failed snapshot yields a
    /// zero-valued summary instead of an error.
    pub fn compute(snapshot: &[Sample], catalog: &Catalog) -> Self {
        // Catalog order first so rollup groups appear in a stable order.
        let position: HashMap<&str, usize> = catalog
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();
        let mut ordered: Vec<Sample> = snapshot.to_vec();
        ordered.sort_by_key(|s| position.get(s.entity_id.as_str()).copied().unwrap_or(usize::MAX));

        let latencies = valid_latencies(&ordered);
        let overall = match summarize(&latencies) {
            Ok(s) => s,
            Err(TelemetryError::NoData) => Summary::zero(),
            Err(e) => {
                tracing::warn!(error = %e, "live summary failed");
                Summary::zero()
            }
        };
        let distribution = Distribution::from_latencies(&latencies);

        let rank = |n: usize| -> Vec<RankedEntity> {
            top_n(&ordered, n)
                .into_iter()
                .filter_map(|s| {
                    let e = catalog.get(&s.entity_id)?;
                    Some(RankedEntity {
                        entity_id: e.id.clone(),
                        name: e.name.clone(),
                        location: e.location.clone(),
                        provider: e.provider.clone(),
                        latency_ms: s.outcome.latency()?,
                        status: s.status,
                    })
                })
                .collect()
        };

        Self {
            overall,
            bands: distribution.bands(),
            distribution,
            by_provider: rollup(&ordered, |id| catalog.provider_of(id)),
            by_region: rollup_by_region(&ordered, |id| catalog.location_of(id)),
            fastest: rank(FASTEST_N),
            ranking: rank(RANKING_N),
            active: latencies.len(),
            total: catalog.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Outcome;

    #[tokio::test]
    async fn newer_reading_replaces_older() {
        let (live, _owner) = LiveTelemetry::spawn(8);
        live.publish(vec![Sample::new("a", 10, Outcome::Ok(50))]).await;
        live.publish(vec![Sample::new("a", 20, Outcome::Ok(70))]).await;
        live.publish(vec![Sample::new("a", 15, Outcome::Ok(90))]).await;
        live.publish(vec![Sample::new("b", 5, Outcome::Failed)]).await;

        let snap = live.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].entity_id, "a");
        assert_eq!(snap[0].outcome, Outcome::Ok(70));
        assert_eq!(snap[1].outcome, Outcome::Failed);
    }

    #[test]
    fn empty_snapshot_gives_zero_summary() {
        let catalog = Catalog::builtin();
        let a = LiveAnalytics::compute(&[], &catalog);
        assert_eq!(a.overall, Summary::zero());
        assert_eq!(a.active, 0);
        assert_eq!(a.total, 12);
        assert!(a.bands.is_empty());
        assert!(a.fastest.is_empty());
    }

    #[test]
    fn analytics_over_catalog_snapshot() {
        let catalog = Catalog::builtin();
        let snap = vec![
            Sample::new("gateio-seoul", 1, Outcome::Ok(55)),
            Sample::new("binance-tokyo", 1, Outcome::Ok(45)),
            Sample::new("huobi-tokyo", 1, Outcome::Ok(47)),
            Sample::new("bitfinex-london", 1, Outcome::Ok(250)),
            Sample::new("deribit-amsterdam", 1, Outcome::Failed),
            Sample::new("not-in-catalog", 1, Outcome::Ok(1)),
        ];
        let a = LiveAnalytics::compute(&snap, &catalog);

        assert_eq!(a.active, 5);
        assert_eq!(a.distribution.total(), 5);
        assert_eq!(a.overall.min, 1);

        let providers: Vec<_> = a.by_provider.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(providers, vec!["AWS", "Azure"]);

        let regions: Vec<_> = a.by_region.iter().map(|g| (g.key.as_str(), g.avg)).collect();
        assert_eq!(regions, vec![("Japan", 46), ("South Korea", 55), ("UK", 250)]);

        let fastest: Vec<_> = a.fastest.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(
            fastest,
            vec!["binance-tokyo", "huobi-tokyo", "gateio-seoul", "bitfinex-london"]
        );
    }
}
