use std::future::Future;

use bourse_cache::{CachePolicy, CacheStatus};
use bourse_models::{
    AppPerformance, Fetched, GoldenKey, MarketOverview, MarketSummary, PotentialQueues,
    PredictionSet, StockHistory, SummaryKind, WeeklyWatchlist,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// A cacheable dataset with a well-formed empty value.
pub trait Dataset: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {
    /// Whether this particular value should be written to cache.
    fn is_cacheable(&self) -> bool {
        true
    }
}

impl Dataset for MarketOverview {}
impl Dataset for WeeklyWatchlist {}
impl Dataset for GoldenKey {}
impl Dataset for PotentialQueues {}
impl Dataset for AppPerformance {}
impl Dataset for PredictionSet {}
impl Dataset for StockHistory {}

impl Dataset for MarketSummary {
    /// Informational status replies ("market closed") are shown once and
    /// never replace a real summary in cache.
    fn is_cacheable(&self) -> bool {
        matches!(
            self.kind,
            SummaryKind::DailySentiment | SummaryKind::WeeklyIndices
        )
    }
}

/// Read-through fetch with stale fallback.
///
/// 1. Unless `force_refresh`, a fresh cache entry is returned as-is.
/// 2. Otherwise `load` runs; success is written back and returned.
/// 3. On failure any cached entry is served, marked stale if expired.
/// 4. With nothing cached, the dataset's empty value is returned.
///
/// Never fails: every failure ends up in the envelope's `_error`.
pub async fn cached_fetch<T, F, Fut>(
    cache: &CachePolicy,
    key: &str,
    force_refresh: bool,
    load: F,
) -> Fetched<T>
where
    T: Dataset,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let cached = decode_status::<T>(key, cache.read_with_status(key).await);

    if !force_refresh {
        if let Some((data, status)) = &cached {
            if status.is_valid {
                debug!(key = %key, "Cache hit");
                return Fetched::from_cache(data.clone(), status.entry.stored_at);
            }
        }
    }

    match load().await {
        Ok(data) => {
            let stored_at = if data.is_cacheable() {
                cache.store().write_typed(key, &data).await
            } else {
                None
            };
            let fetched_at = stored_at.unwrap_or_else(|| cache.store().now_millis());
            info!(key = %key, cached = stored_at.is_some(), "Fetched");
            Fetched::fresh(data, fetched_at)
        }
        Err(e) => match cached {
            Some((data, status)) => {
                warn!(key = %key, stale = status.is_stale, error = %e, "Fetch failed, serving cached data");
                Fetched::fallback(data, status.entry.stored_at, status.is_stale, e.to_string())
            }
            None => {
                warn!(key = %key, error = %e, "Fetch failed with nothing cached");
                Fetched::unavailable(T::default())
            }
        },
    }
}

/// An entry that no longer decodes into `T` is treated as absent.
fn decode_status<T: Dataset>(key: &str, status: Option<CacheStatus>) -> Option<(T, CacheStatus)> {
    let status = status?;
    match serde_json::from_value::<T>(status.entry.payload.clone()) {
        Ok(data) => Some((data, status)),
        Err(e) => {
            warn!(key = %key, error = %e, "Cached payload does not decode, ignoring");
            None
        }
    }
}
