use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bourse_models::cache_schema::key_patterns;
use bourse_models::CacheEntry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::CacheError;
use crate::memory::MemoryCache;

/// A string key/value storage capability. Mockable for testing.
///
/// `set_many` must be all-or-nothing and `get_many` must not observe a
/// half-applied `set_many`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, CacheError>;

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.set_many(&[(key.to_string(), value.to_string())]).await
    }
}

/// Non-durable store. Stands in for the durable medium in tests and holds
/// session-scoped values that must not outlive the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    max_entries: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes which would grow it past `max_entries`.
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> CacheError {
    CacheError::Unavailable(format!("memory store lock poisoned: {e}"))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    async fn set_many(&self, new_entries: &[(String, String)]) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if let Some(limit) = self.max_entries {
            let added = new_entries
                .iter()
                .filter(|(key, _)| !entries.contains_key(key))
                .count();
            if entries.len() + added > limit {
                return Err(CacheError::QuotaExceeded { limit });
            }
        }
        for (key, value) in new_entries {
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Best-effort dataset cache: moka (hot) → durable store → absent.
///
/// Each dataset is stored as a payload key plus a timestamp key, written
/// together in one `set_many`. Storage failures are logged and swallowed;
/// callers only ever see "written" or "absent".
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    hot: MemoryCache,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>, max_capacity: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            hot: MemoryCache::new(max_capacity),
            clock,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Store `payload` under `key` stamped with the current time.
    /// Returns the timestamp on success, `None` if the write was dropped.
    pub async fn write(&self, key: &str, payload: &serde_json::Value) -> Option<i64> {
        let stored_at = self.clock.now_millis();
        let encoded = match serde_json::to_string(payload) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache payload");
                return None;
            }
        };

        let result = self
            .store
            .set_many(&[
                (key_patterns::payload(key), encoded),
                (key_patterns::timestamp(key), stored_at.to_string()),
            ])
            .await;

        match result {
            Ok(()) => {
                self.hot
                    .insert(CacheEntry {
                        key: key.to_string(),
                        payload: payload.clone(),
                        stored_at,
                    })
                    .await;
                info!(key, stored_at, "Cached dataset");
                Some(stored_at)
            }
            Err(e) => {
                // The durable pair is unchanged; drop any hot copy so reads agree with it.
                self.hot.invalidate(key).await;
                warn!(key, error = %e, "Failed to cache dataset");
                None
            }
        }
    }

    pub async fn write_typed<T: Serialize>(&self, key: &str, payload: &T) -> Option<i64> {
        match serde_json::to_value(payload) {
            Ok(value) => self.write(key, &value).await,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache payload");
                None
            }
        }
    }

    /// Read the entry for `key`. Absent if never written, half-present,
    /// undecodable, or the store is unavailable.
    pub async fn read(&self, key: &str) -> Option<CacheEntry> {
        if let Some(entry) = self.hot.get(key).await {
            debug!(key, "Hot cache hit");
            return Some(entry);
        }

        let payload_key = key_patterns::payload(key);
        let timestamp_key = key_patterns::timestamp(key);
        let values = match self.store.get_many(&[&payload_key, &timestamp_key]).await {
            Ok(values) => values,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached dataset");
                return None;
            }
        };

        let (Some(Some(raw_payload)), Some(Some(raw_timestamp))) = (values.first(), values.get(1))
        else {
            return None;
        };

        let payload = match serde_json::from_str(raw_payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache payload");
                return None;
            }
        };
        let stored_at = match raw_timestamp.trim().parse::<i64>() {
            Ok(stored_at) => stored_at,
            Err(e) => {
                warn!(key, error = %e, "Discarding cache entry with bad timestamp");
                return None;
            }
        };

        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            stored_at,
        };
        self.hot.insert(entry.clone()).await;
        Some(entry)
    }

    /// Remove a dataset's entry from both layers.
    pub async fn clear(&self, key: &str) {
        self.hot.invalidate(key).await;
        for storage_key in [key_patterns::payload(key), key_patterns::timestamp(key)] {
            if let Err(e) = self.store.remove(&storage_key).await {
                warn!(key, error = %e, "Failed to clear cached dataset");
            }
        }
    }

    /// Get the number of entries in the hot moka cache.
    pub fn hot_cache_size(&self) -> u64 {
        self.hot.entry_count()
    }
}
