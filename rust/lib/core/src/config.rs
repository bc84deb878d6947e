//! Configuration for a nounbase instance.
//!
//! Read from a TOML file:
//!
//! ```toml
//! [cache]
//! max_size = 500
//! ttl_ms = 30000
//!
//! [batch]
//! max_batch_size = 50
//!
//! [nouns.Customer]
//! name = "string"
//! tier = "free | pro"
//!
//! [nouns.Order]
//! customer = "->Customer"
//! placed_at = "datetime?"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Query cache construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Maximum number of entries before LRU eviction kicks in.
    pub max_size: usize,
    /// Entry lifetime in milliseconds. `0` disables expiry.
    pub ttl_ms: u64,
    /// When false, `get` always misses and `set` is a no-op.
    pub enabled: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_ms: 60_000,
            enabled: true,
        }
    }
}

impl CacheOptions {
    /// Entry lifetime, `None` when expiry is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_ms > 0).then(|| Duration::from_millis(self.ttl_ms))
    }
}

/// Query batcher construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Maximum number of queued requests drained per dispatch.
    pub max_batch_size: usize,
    /// Batch window in milliseconds. `0` dispatches on the next scheduler tick.
    pub batch_interval_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_interval_ms: 0,
        }
    }
}

impl BatchOptions {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NounbaseConfig {
    #[serde(default)]
    pub cache: CacheOptions,

    #[serde(default)]
    pub batch: BatchOptions,

    /// Raw field definitions per noun, in declaration order.
    /// Parsed into schemas by the schema crate.
    #[serde(default)]
    pub nouns: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl NounbaseConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NounbaseConfig::default();
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(60)));
        assert!(config.cache.enabled);
        assert_eq!(config.batch.max_batch_size, 100);
        assert_eq!(config.batch.interval(), Duration::ZERO);
        assert!(config.nouns.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let opts = CacheOptions { ttl_ms: 0, ..Default::default() };
        assert_eq!(opts.ttl(), None);
    }

    #[test]
    fn test_from_toml() {
        let config = NounbaseConfig::from_toml(
            r#"
[cache]
max_size = 2
ttl_ms = 0

[nouns.Organization]
name = "string"
members = "<-User"

[nouns.User]
email = "string"
organization = "->Organization"
tags = ["->Tag"]
"#,
        )
        .unwrap();

        assert_eq!(config.cache.max_size, 2);
        assert_eq!(config.cache.ttl(), None);
        assert!(config.cache.enabled);
        assert_eq!(config.batch, BatchOptions::default());

        let user = &config.nouns["User"];
        let keys: Vec<&str> = user.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["email", "organization", "tags"]);
        assert_eq!(user["tags"], serde_json::json!(["->Tag"]));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nounbase.toml");
        std::fs::write(&path, "[batch]\nbatch_interval_ms = 5\n").unwrap();

        let config = NounbaseConfig::load(&path).unwrap();
        assert_eq!(config.batch.interval(), Duration::from_millis(5));
        assert_eq!(config.batch.max_batch_size, 100);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NounbaseConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = NounbaseConfig::from_toml("[cache\nmax_size = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
