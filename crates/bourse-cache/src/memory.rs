use bourse_models::CacheEntry;
use moka::future::Cache;

/// In-memory hot layer backed by moka.
///
/// Holds decoded entries so repeated reads skip the durable store and JSON
/// parsing. Entries are only evicted by capacity; freshness is decided at
/// read time by the cache policy.
pub struct MemoryCache {
    inner: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, entry: CacheEntry) {
        self.inner.insert(entry.key.clone(), entry).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
