//! Configuration module for probebench.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::{default_catalog, CatalogError, CatalogFile, Registry};

const TARGET_URL_PREFIX: &str = "PROBEBENCH_TARGET_";
const TARGET_URL_SUFFIX: &str = "_URL";

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8090)
    pub http_port: u16,
    /// JSON catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Budget for one probe request (default: 10s)
    pub probe_timeout: Duration,
    /// Budget for one availability check (default: 3s)
    pub health_timeout: Duration,
    /// Pause between probes of a run (default: 800ms)
    pub probe_delay: Duration,
    /// Base URL overrides as (target id, URL)
    pub target_urls: Vec<(String, String)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8090,
            catalog_path: None,
            probe_timeout: Duration::from_millis(10_000),
            health_timeout: Duration::from_millis(3_000),
            probe_delay: Duration::from_millis(800),
            target_urls: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PROBEBENCH_HTTP_PORT`: HTTP port (default: 8090)
    /// - `PROBEBENCH_CATALOG`: path to a JSON catalog file
    /// - `PROBEBENCH_PROBE_TIMEOUT_MS`: probe timeout (default: 10000)
    /// - `PROBEBENCH_HEALTH_TIMEOUT_MS`: availability check timeout (default: 3000)
    /// - `PROBEBENCH_PROBE_DELAY_MS`: delay between probes of a run (default: 800)
    /// - `PROBEBENCH_TARGET_<ID>_URL`: base URL for the target `<id>` (lowercased)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars())
    }

    /// Build configuration from key/value pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cfg = Self::default();

        for (key, value) in vars {
            match key.as_str() {
                "PROBEBENCH_HTTP_PORT" => cfg.http_port = parse(&key, &value)?,
                "PROBEBENCH_CATALOG" => cfg.catalog_path = Some(PathBuf::from(value)),
                "PROBEBENCH_PROBE_TIMEOUT_MS" => cfg.probe_timeout = parse_millis(&key, &value)?,
                "PROBEBENCH_HEALTH_TIMEOUT_MS" => cfg.health_timeout = parse_millis(&key, &value)?,
                "PROBEBENCH_PROBE_DELAY_MS" => cfg.probe_delay = parse_millis(&key, &value)?,
                _ => {
                    if let Some(id) = key
                        .strip_prefix(TARGET_URL_PREFIX)
                        .and_then(|rest| rest.strip_suffix(TARGET_URL_SUFFIX))
                    {
                        if id.is_empty() {
                            return Err(ConfigError::Invalid { key, value });
                        }
                        cfg.target_urls.push((id.to_lowercase(), value));
                    }
                }
            }
        }

        if cfg.probe_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "PROBEBENCH_PROBE_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
            });
        }
        if cfg.health_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "PROBEBENCH_HEALTH_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
            });
        }

        cfg.target_urls.sort();
        Ok(cfg)
    }

    /// Build the probe registry this configuration describes.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let mut catalog: CatalogFile = match &self.catalog_path {
            Some(path) => CatalogFile::load(path)?,
            None => default_catalog(),
        };

        for (id, url) in &self.target_urls {
            if catalog.override_base_url(id, url) {
                tracing::info!("Target {} base URL set to {}", id, url);
            } else {
                tracing::warn!("Ignoring base URL override for unknown target {}", id);
            }
        }

        Ok(Registry::from_catalog(catalog)?)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(key, value).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8090);
        assert!(cfg.catalog_path.is_none());
        assert_eq!(cfg.probe_timeout, Duration::from_secs(10));
        assert_eq!(cfg.health_timeout, Duration::from_secs(3));
        assert_eq!(cfg.probe_delay, Duration::from_millis(800));
    }

    #[test]
    fn test_from_vars() {
        let cfg = ServerConfig::from_vars(vars(&[
            ("PROBEBENCH_HTTP_PORT", "9000"),
            ("PROBEBENCH_PROBE_TIMEOUT_MS", "2500"),
            ("PROBEBENCH_PROBE_DELAY_MS", "0"),
            ("PROBEBENCH_TARGET_FLASK_URL", "http://10.0.0.5:5001"),
            ("HOME", "/root"),
        ]))
        .unwrap();

        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.probe_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.probe_delay, Duration::ZERO);
        assert_eq!(cfg.health_timeout, Duration::from_secs(3));
        assert_eq!(
            cfg.target_urls,
            vec![("flask".to_string(), "http://10.0.0.5:5001".to_string())]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ServerConfig::from_vars(vars(&[("PROBEBENCH_HTTP_PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_vars(vars(&[("PROBEBENCH_PROBE_TIMEOUT_MS", "0")])).is_err());
        assert!(ServerConfig::from_vars(vars(&[("PROBEBENCH_TARGET__URL", "http://x")])).is_err());
    }

    #[test]
    fn test_registry_applies_overrides() {
        let cfg = ServerConfig::from_vars(vars(&[
            ("PROBEBENCH_TARGET_SIMPLE_URL", "http://10.0.0.6:7000"),
            ("PROBEBENCH_TARGET_GONE_URL", "http://10.0.0.7:7000"),
        ]))
        .unwrap();

        let registry = cfg.registry().unwrap();
        assert_eq!(
            registry.target("simple").unwrap().health_url,
            "http://10.0.0.6:7000/api/health"
        );
        assert_eq!(
            registry.find_probe("simple", "Ping").unwrap().endpoint.url,
            "http://10.0.0.6:7000/api/ping"
        );
        assert_eq!(
            registry.target("flask").unwrap().health_url,
            "http://localhost:5001/api/health"
        );
    }

    #[test]
    fn test_registry_from_catalog_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{ "targets": [{{ "id": "svc1", "name": "Svc", "base_url": "http://127.0.0.1:9",
                "probes": [{{ "name": "Ping", "path": "/ping" }}] }}] }}"#
        )
        .unwrap();

        let cfg = ServerConfig {
            catalog_path: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let registry = cfg.registry().unwrap();
        assert_eq!(registry.targets().len(), 1);
        assert_eq!(registry.target("svc1").unwrap().health_url, "http://127.0.0.1:9/api/health");

        let missing = ServerConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/catalog.json")),
            ..Default::default()
        };
        assert!(matches!(
            missing.registry(),
            Err(ConfigError::Catalog(CatalogError::Io(_)))
        ));
    }
}
