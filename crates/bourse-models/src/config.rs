use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the dashboard client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BourseConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Configuration for the backend HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Configuration for the persistent cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Path to the SQLite file holding cached datasets and the long-lived auth token.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Maximum number of decoded entries kept in the in-memory hot layer.
    #[serde(default = "default_memory_capacity")]
    pub memory_max_capacity: u64,
    #[serde(default)]
    pub ttl: TtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            memory_max_capacity: default_memory_capacity(),
            ttl: TtlConfig::default(),
        }
    }
}

/// Time-to-live table, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtlConfig {
    /// Landing page dataset (market overview).
    #[serde(default = "default_home_ttl")]
    pub home_seconds: u64,
    /// Secondary analytical datasets.
    #[serde(default = "default_other_ttl")]
    pub other_seconds: u64,
    /// Applied to keys no rule matches.
    #[serde(default = "default_other_ttl")]
    pub default_seconds: u64,
    /// Exact dataset keys or key prefixes mapped to a TTL. Longest match wins.
    #[serde(default)]
    pub overrides: BTreeMap<String, u64>,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            home_seconds: default_home_ttl(),
            other_seconds: default_other_ttl(),
            default_seconds: default_other_ttl(),
            overrides: BTreeMap::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_sqlite_path() -> String {
    "data/bourse_cache.db".to_string()
}
fn default_memory_capacity() -> u64 {
    1_000
}
fn default_home_ttl() -> u64 {
    60 * 60
}
fn default_other_ttl() -> u64 {
    2 * 60 * 60
}
