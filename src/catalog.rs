use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─── Domain type ─────────────────────────────────────────────────

/// One monitored endpoint and the metadata the engine needs about it.
/// Samples only carry `id`; everything else is looked up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Human label, `"City, Country"` or just `"City"`.
    pub location: String,
    /// Cloud provider (AWS, GCP, Azure).
    pub provider: String,
    /// Provider region code, e.g. `ap-northeast-1`.
    #[serde(default)]
    pub cloud_region: String,
    /// Health endpoint hit by the live probe.
    pub endpoint: String,
    /// Typical round trip, drives the mock generator.
    #[serde(default = "default_base_latency")]
    pub base_latency_ms: u32,
}

fn default_base_latency() -> u32 {
    100
}

// ─── Catalog ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Catalog {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(entities: Vec<Entity>) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { entities, index }
    }

    /// The exchange servers monitored out of the box.
    pub fn builtin() -> Self {
        Self::new(builtin_entities())
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn provider_of(&self, id: &str) -> Option<String> {
        self.get(id).map(|e| e.provider.clone())
    }

    pub fn location_of(&self, id: &str) -> Option<String> {
        self.get(id).map(|e| e.location.clone())
    }
}

// ─── Built-in entities ───────────────────────────────────────────

#[rustfmt::skip]
static BUILTIN: &[(&str, &str, &str, &str, &str, &str, u32)] = &[
    ("binance-tokyo",     "Binance",  "Tokyo, Japan",           "AWS",   "ap-northeast-1", "https://api.binance.com/api/v3/ping",              45),
    ("binance-virginia",  "Binance",  "Virginia, USA",          "AWS",   "us-east-1",      "https://api.binance.us/api/v3/ping",               85),
    ("bybit-singapore",   "Bybit",    "Singapore",              "AWS",   "ap-southeast-1", "https://api.bybit.com/v5/market/time",             52),
    ("okx-singapore",     "OKX",      "Singapore",              "AWS",   "ap-southeast-1", "https://www.okx.com/api/v5/public/time",           48),
    ("deribit-amsterdam", "Deribit",  "Amsterdam, Netherlands", "GCP",   "europe-west4",   "https://www.deribit.com/api/v2/public/get_time",   95),
    ("kraken-frankfurt",  "Kraken",   "Frankfurt, Germany",     "AWS",   "eu-central-1",   "https://api.kraken.com/0/public/Time",             88),
    ("coinbase-virginia", "Coinbase", "Virginia, USA",          "AWS",   "us-east-1",      "https://api.coinbase.com/v2/time",                 82),
    ("bitfinex-london",   "Bitfinex", "London, UK",             "Azure", "uksouth",        "https://api-pub.bitfinex.com/v2/platform/status",  92),
    ("huobi-tokyo",       "Huobi",    "Tokyo, Japan",           "AWS",   "ap-northeast-1", "https://api.huobi.pro/v1/common/timestamp",        47),
    ("kucoin-singapore",  "KuCoin",   "Singapore",              "AWS",   "ap-southeast-1", "https://api.kucoin.com/api/v1/timestamp",          50),
    ("gateio-seoul",      "Gate.io",  "Seoul, South Korea",     "AWS",   "ap-northeast-2", "https://api.gateio.ws/api/v4/spot/time",           55),
    ("mexc-singapore",    "MEXC",     "Singapore",              "GCP",   "asia-southeast1","https://api.mexc.com/api/v3/ping",                 53),
];

pub fn builtin_entities() -> Vec<Entity> {
    BUILTIN
        .iter()
        .map(
            |&(id, name, location, provider, cloud_region, endpoint, base)| Entity {
                id: id.into(),
                name: name.into(),
                location: location.into(),
                provider: provider.into(),
                cloud_region: cloud_region.into(),
                endpoint: endpoint.into(),
                base_latency_ms: base,
            },
        )
        .collect()
}
