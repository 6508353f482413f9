use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bourse_models::cache_schema::dataset;
use bourse_models::config::TtlConfig;
use bourse_models::CacheEntry;

use crate::store::CacheStore;

/// Maximum age per dataset key.
///
/// Rules are dataset keys or key prefixes; the longest rule that prefixes a
/// key decides its TTL, and keys no rule matches get the default.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    rules: BTreeMap<String, Duration>,
    default: Duration,
}

impl TtlPolicy {
    pub fn new(default: Duration) -> Self {
        Self {
            rules: BTreeMap::new(),
            default,
        }
    }

    pub fn with_rule(mut self, key_or_prefix: impl Into<String>, ttl: Duration) -> Self {
        self.rules.insert(key_or_prefix.into(), ttl);
        self
    }

    /// The market overview gets the short "home" TTL; every other known
    /// dataset gets the longer one. Config overrides are applied last.
    pub fn from_config(config: &TtlConfig) -> Self {
        let home = Duration::from_secs(config.home_seconds);
        let other = Duration::from_secs(config.other_seconds);

        let mut policy = Self::new(Duration::from_secs(config.default_seconds))
            .with_rule(dataset::MARKET_OVERVIEW, home);
        for key in [
            dataset::MARKET_SUMMARY,
            dataset::WEEKLY_WATCHLIST,
            dataset::GOLDEN_KEY,
            dataset::POTENTIAL_QUEUES,
            dataset::APP_PERFORMANCE,
            dataset::ML_PREDICTIONS,
            dataset::STOCK_HISTORY,
        ] {
            policy = policy.with_rule(key, other);
        }
        for (key, seconds) in &config.overrides {
            policy = policy.with_rule(key.clone(), Duration::from_secs(*seconds));
        }
        policy
    }

    pub fn ttl_for(&self, key: &str) -> Duration {
        self.rules
            .iter()
            .filter(|(rule, _)| key.starts_with(rule.as_str()))
            .max_by_key(|(rule, _)| rule.len())
            .map(|(_, ttl)| *ttl)
            .unwrap_or(self.default)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&TtlConfig::default())
    }
}

/// A cached entry annotated with its freshness at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub entry: CacheEntry,
    pub is_valid: bool,
    pub is_stale: bool,
}

/// Decides whether a cached dataset is fresh, stale or absent.
///
/// Nothing is ever deleted for being old; staleness is only a read-time verdict.
pub struct CachePolicy {
    store: Arc<CacheStore>,
    ttl: TtlPolicy,
}

impl CachePolicy {
    pub fn new(store: Arc<CacheStore>, ttl: TtlPolicy) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Fresh means strictly younger than the key's TTL. An entry stamped in
    /// the future is treated as stale.
    pub fn is_entry_fresh(&self, entry: &CacheEntry, now_millis: i64) -> bool {
        let max_age = i64::try_from(self.ttl.ttl_for(&entry.key).as_millis()).unwrap_or(i64::MAX);
        entry
            .age_millis(now_millis)
            .is_some_and(|age| age < max_age)
    }

    pub async fn is_fresh(&self, key: &str) -> bool {
        match self.store.read(key).await {
            Some(entry) => self.is_entry_fresh(&entry, self.store.now_millis()),
            None => false,
        }
    }

    /// The entry for `key` regardless of age, or `None` if never written.
    pub async fn read_with_status(&self, key: &str) -> Option<CacheStatus> {
        let entry = self.store.read(key).await?;
        let is_valid = self.is_entry_fresh(&entry, self.store.now_millis());
        Some(CacheStatus {
            entry,
            is_valid,
            is_stale: !is_valid,
        })
    }
}
