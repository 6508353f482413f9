use std::sync::Arc;

use bourse_cache::CachePolicy;
use chrono::{DateTime, TimeZone, Utc};

use crate::auth::AuthSession;
use crate::executor::ApiClient;

/// Entry point for every dataset fetcher and account operation.
///
/// Cheap to clone; all clones share one executor, one auth session and
/// one cache.
#[derive(Clone)]
pub struct BourseClient {
    api: Arc<ApiClient>,
    cache: Arc<CachePolicy>,
}

impl BourseClient {
    pub fn new(api: ApiClient, cache: CachePolicy) -> Self {
        Self {
            api: Arc::new(api),
            cache: Arc::new(cache),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &CachePolicy {
        &self.cache
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        self.api.session()
    }

    /// "Now" according to the cache clock.
    pub fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.cache.store().now_millis())
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Drop a dataset from cache so the next fetch goes to the backend.
    pub async fn clear_cached(&self, dataset: &str) {
        self.cache.store().clear(dataset).await;
    }
}
