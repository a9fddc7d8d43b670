use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::catalog::{Catalog, Entity};

/// Top-level service configuration. Every field has a default, so an
/// empty file (or no file) runs against local Redis with the built-in
/// catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds. Default: "0.0.0.0:3000".
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Sample store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Samples older than this are pruned after each write. Default: 30d.
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    /// Live probe configuration.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Mock telemetry configuration.
    #[serde(default)]
    pub mock: MockConfig,

    /// Push interval of the analytics SSE stream. Default: 1s.
    #[serde(default = "default_stream_interval", with = "humantime_serde")]
    pub stream_interval: Duration,

    /// Monitored entities. Empty means the built-in exchange list.
    #[serde(default)]
    pub catalog: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "redis" or "memory". Default: redis.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL. Default: "redis://127.0.0.1:6379/".
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Deadline for a range query on the read path. Default: 2s.
    #[serde(default = "default_store_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Per-probe deadline. Default: 5s.
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    /// Store writes in flight per mock batch. Default: 8.
    #[serde(default = "default_write_concurrency")]
    pub write_concurrency: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".into()
}

fn default_retention() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_stream_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".into()
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_write_concurrency() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            store: StoreConfig::default(),
            retention: default_retention(),
            probe: ProbeConfig::default(),
            mock: MockConfig::default(),
            stream_interval: default_stream_interval(),
            catalog: Vec::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            timeout: default_store_timeout(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            write_concurrency: default_write_concurrency(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        Self::from_yaml(&data).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            bail!("listen_addr is required");
        }
        if self.retention.is_zero() {
            bail!("retention must be positive");
        }
        if self.stream_interval.is_zero() {
            bail!("stream_interval must be positive");
        }
        if self.store.timeout.is_zero() {
            bail!("store.timeout must be positive");
        }
        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_empty() {
            bail!("store.redis_url is required for the redis backend");
        }
        if self.probe.timeout.is_zero() {
            bail!("probe.timeout must be positive");
        }
        if self.mock.write_concurrency == 0 {
            bail!("mock.write_concurrency must be positive");
        }

        let mut seen = HashSet::new();
        for entity in &self.catalog {
            if entity.id.trim().is_empty() {
                bail!("catalog entity with empty id");
            }
            if !seen.insert(entity.id.as_str()) {
                bail!("duplicate catalog entity: {}", entity.id);
            }
        }

        Ok(())
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention.as_millis() as i64
    }

    pub fn build_catalog(&self) -> Catalog {
        if self.catalog.is_empty() {
            Catalog::builtin()
        } else {
            Catalog::new(self.catalog.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = Config::from_yaml("{}").unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.store.backend, StoreBackend::Redis);
        assert_eq!(cfg.retention_ms(), crate::telemetry::DEFAULT_RETENTION_MS);
        assert_eq!(cfg.probe.timeout, Duration::from_secs(5));
        assert_eq!(cfg.build_catalog().len(), 12);
    }

    #[test]
    fn parses_humantime_and_catalog() {
        let cfg = Config::from_yaml(
            r#"
store:
  backend: memory
  timeout: 250ms
retention: 7d
stream_interval: 500ms
catalog:
  - id: lab-oslo
    name: Lab
    location: Oslo, Norway
    provider: GCP
    endpoint: http://127.0.0.1:8080/health
    base_latency_ms: 12
"#,
        )
        .unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.timeout, Duration::from_millis(250));
        assert_eq!(cfg.retention, Duration::from_secs(7 * 24 * 3600));
        let catalog = cfg.build_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("lab-oslo").unwrap().base_latency_ms, 12);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_yaml("mock:\n  write_concurrency: 0\n").is_err());
        assert!(Config::from_yaml("retention: 0s\n").is_err());

        let dup = r#"
catalog:
  - {id: a, name: A, location: X, provider: AWS, endpoint: "http://a"}
  - {id: a, name: B, location: Y, provider: AWS, endpoint: "http://b"}
"#;
        let err = Config::from_yaml(dup).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
