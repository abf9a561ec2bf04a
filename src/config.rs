//! # Configuration
//!
//! YAML configuration for a [`LoaderSystem`](crate::lifecycle::LoaderSystem).
//! Every section and field is optional; missing values take their defaults.
//!
//! ```yaml
//! runtime:
//!   worker_threads: 4
//! cache:
//!   max_entries: 512
//!   max_entry_size: 52428800
//!   path: /var/cache/tiles
//! network:
//!   max_concurrent_requests: 20
//!   rate_limit_timeout: 5s
//!   clock_skew_retry_timeout: 30s
//!   online: true
//! assets:
//!   path: /usr/share/tiles
//! logging:
//!   level: info
//! ```

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_MAXIMUM_ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::file_source::DEFAULT_MAXIMUM_CONCURRENT_REQUESTS;
use crate::retry::{RetryPolicy, CLOCK_SKEW_RETRY_TIMEOUT, DEFAULT_RATE_LIMIT_TIMEOUT};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Worker pool settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Threads draining actor mailboxes and running network I/O.
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: 4 }
    }
}

/// Response cache settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses per cache layer.
    pub max_entries: usize,

    /// Responses larger than this many bytes are never cached.
    pub max_entry_size: u64,

    /// Directory of the persistent cache. Memory only when unset.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CAPACITY,
            max_entry_size: DEFAULT_MAXIMUM_ENTRY_SIZE,
            path: None,
        }
    }
}

/// Network and retry settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_concurrent_requests: usize,

    /// Wait after a rate-limited response without `Retry-After`.
    #[serde(with = "humantime_serde")]
    pub rate_limit_timeout: Duration,

    /// Minimum validity granted to responses that arrive already expired.
    #[serde(with = "humantime_serde")]
    pub clock_skew_retry_timeout: Duration,

    /// Start online. When `false` every request fails with a connection error.
    pub online: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAXIMUM_CONCURRENT_REQUESTS,
            rate_limit_timeout: DEFAULT_RATE_LIMIT_TIMEOUT,
            clock_skew_retry_timeout: CLOCK_SKEW_RETRY_TIMEOUT,
            online: true,
        }
    }
}

impl NetworkConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            rate_limit_timeout: self.rate_limit_timeout,
            clock_skew_retry_timeout: self.clock_skew_retry_timeout,
        }
    }
}

/// Local asset settings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetConfig {
    /// Root directory for `asset://` URLs. Such URLs are unsupported when unset.
    pub path: Option<PathBuf>,
}

/// Log output settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub assets: AssetConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads the configuration from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Config {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Like [`Config::from_path`], but defaults when no path is given.
    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.runtime.worker_threads, 4);
        assert_eq!(config.cache.max_entries, 512);
        assert_eq!(config.cache.max_entry_size, 50 * 1024 * 1024);
        assert_eq!(config.network.max_concurrent_requests, 20);
        assert_eq!(config.network.rate_limit_timeout, Duration::from_secs(5));
        assert_eq!(config.network.clock_skew_retry_timeout, Duration::from_secs(30));
        assert!(config.network.online);
        assert_eq!(config.assets.path, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
network:
  rate_limit_timeout: 1m 30s
  online: false
cache:
  max_entries: 16
assets:
  path: /usr/share/tiles
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.network.rate_limit_timeout, Duration::from_secs(90));
        assert!(!config.network.online);
        assert_eq!(config.network.max_concurrent_requests, 20);
        assert_eq!(config.cache.max_entries, 16);
        assert_eq!(config.assets.path, Some(PathBuf::from("/usr/share/tiles")));
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml_is_a_parsing_error() {
        let result = Config::from_yaml_str("network: [1, 2");
        assert!(matches!(result, Err(Error::Parsing(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "runtime:\n  worker_threads: 2").unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.runtime.worker_threads, 2);

        let missing = Config::from_path("/nonexistent/tile-loader.yml");
        assert!(matches!(missing, Err(Error::Config { .. })));
    }
}
