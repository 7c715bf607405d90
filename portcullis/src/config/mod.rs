//! Gateway configuration, loaded from YAML.
//!
//! Schema mirrors the external interface table: `s3proxy` version pin,
//! server bind/TLS/timeouts/headers, a named map of upstream `sources`
//! (order-preserving, since fan-out order is declaration order),
//! `public-keys`, and the on-disk `cache` budget.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

const SUPPORTED_VERSION: &str = "2";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unsupported s3proxy version {found:?}, expected {SUPPORTED_VERSION:?}")]
    UnsupportedVersion { found: String },
    #[error("no sources configured")]
    NoSources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub s3proxy: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: IndexMap<String, SourceConfig>,
    #[serde(rename = "public-keys", default)]
    pub public_keys: Vec<String>,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub headers: Headers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub acme: Option<AcmeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcmeConfig {
    pub domains: Vec<String>,
    #[serde(rename = "cache-dir")]
    pub cache_dir: PathBuf,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_read_timeout")]
    pub read: u64,
    #[serde(default = "default_write_timeout")]
    pub write: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle: u64,
}

fn default_read_timeout() -> u64 {
    10
}
fn default_write_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    60
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: default_read_timeout(),
            write: default_write_timeout(),
            idle: default_idle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Headers {
    #[serde(default = "default_cors")]
    pub cors: String,
    #[serde(default)]
    pub cache: String,
}

fn default_cors() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Present for an S3-compatible source; absent selects FTP.
    pub bucket: Option<String>,
    pub host: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub root: String,
    /// Per-source fetch timeout in seconds; unset means no timeout.
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Budget in gigabytes (x10^9 bytes); 0 disables caching.
    pub size: u64,
    pub dir: PathBuf,
}

impl CacheConfig {
    /// Budget in bytes, as the signed 64-bit quantity the cache arithmetic
    /// uses throughout.
    pub fn max_bytes(&self) -> i64 {
        (self.size as i64).saturating_mul(1_000_000_000)
    }
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GatewayConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.s3proxy != SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion { found: self.s3proxy.clone() });
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
s3proxy: "2"
server:
  addr: "0.0.0.0:8443"
  headers:
    cors: "*"
    cache: "public, max-age=3600"
sources:
  primary:
    bucket: tiles
    host: s3.example.com
    id: AKIA
    key: secret
    root: ""
public-keys: []
cache:
  size: 10
  dir: /var/cache/portcullis
"#;

    #[test]
    fn parses_the_documented_shape() {
        let config: GatewayConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.s3proxy, "2");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.cache.max_bytes(), 10_000_000_000);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_wrong_version() {
        let bad = SAMPLE.replacen("\"2\"", "\"1\"", 1);
        let config: GatewayConfig = serde_yaml::from_str(&bad).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_empty_sources() {
        let bad = SAMPLE.replace(
            "sources:\n  primary:\n    bucket: tiles\n    host: s3.example.com\n    id: AKIA\n    key: secret\n    root: \"\"\n",
            "sources: {}\n",
        );
        let config: GatewayConfig = serde_yaml::from_str(&bad).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn source_declaration_order_is_preserved() {
        let yaml = r#"
s3proxy: "2"
server:
  addr: "0.0.0.0:8443"
sources:
  third:
    host: c
  first:
    host: a
  second:
    host: b
public-keys: []
cache:
  size: 0
  dir: /tmp/cache
"#;
        let config: GatewayConfig = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<_> = config.sources.keys().cloned().collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }
}
