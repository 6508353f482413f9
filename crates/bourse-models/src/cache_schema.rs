use serde::{Deserialize, Serialize};

/// Schema of the durable key/value table behind the persistent store.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS kv_entries (
///     key         TEXT PRIMARY KEY,
///     value       TEXT NOT NULL,
///     updated_at  TEXT NOT NULL
/// );
/// ```
pub const KV_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS kv_entries (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

/// Stable dataset identifiers used to namespace cache entries.
pub mod dataset {
    pub const MARKET_OVERVIEW: &str = "market_overview";
    pub const WEEKLY_WATCHLIST: &str = "weekly_watchlist";
    pub const GOLDEN_KEY: &str = "golden_key";
    pub const POTENTIAL_QUEUES: &str = "potential_queues";
    pub const APP_PERFORMANCE: &str = "app_performance";
    pub const ML_PREDICTIONS: &str = "ml_predictions";
    pub const MARKET_SUMMARY: &str = "market_summary";
    pub const STOCK_HISTORY: &str = "stock_history";

    /// `app_performance_{period}_{source}` (e.g., `app_performance_weekly_overall`)
    pub fn app_performance(period_type: &str, signal_source: &str) -> String {
        format!("{APP_PERFORMANCE}_{period_type}_{signal_source}")
    }

    /// `stock_history_{symbol}_{range}` (e.g., `stock_history_FOLD_21d`)
    pub fn stock_history(symbol: &str, range_tag: &str) -> String {
        format!("{STOCK_HISTORY}_{symbol}_{range_tag}")
    }
}

/// Key pattern conventions for the durable store.
///
/// - Dataset payload: `api_cache_{dataset}` (e.g., `api_cache_market_overview`)
/// - Write timestamp (epoch millis): `api_timestamp_{dataset}`
/// - Auth token (both long-lived and session stores): `auth_token`
/// - Remember-me flag (long-lived store): `auth_remember`
pub mod key_patterns {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const AUTH_REMEMBER: &str = "auth_remember";

    pub fn payload(dataset: &str) -> String {
        format!("api_cache_{dataset}")
    }

    pub fn timestamp(dataset: &str) -> String {
        format!("api_timestamp_{dataset}")
    }
}

/// A cached dataset payload together with the time it was written.
///
/// Both halves are always written and read as a pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub stored_at: i64,
}

impl CacheEntry {
    /// Age at `now_millis`, or `None` when the timestamp lies in the future.
    pub fn age_millis(&self, now_millis: i64) -> Option<i64> {
        let age = now_millis.saturating_sub(self.stored_at);
        (age >= 0).then_some(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pattern_payload() {
        assert_eq!(
            key_patterns::payload(dataset::MARKET_OVERVIEW),
            "api_cache_market_overview"
        );
    }

    #[test]
    fn key_pattern_timestamp() {
        assert_eq!(
            key_patterns::timestamp(dataset::GOLDEN_KEY),
            "api_timestamp_golden_key"
        );
    }

    #[test]
    fn parameterized_dataset_keys() {
        assert_eq!(
            dataset::app_performance("monthly", "golden_key"),
            "app_performance_monthly_golden_key"
        );
        assert_eq!(
            dataset::stock_history("FOLD", "21d"),
            "stock_history_FOLD_21d"
        );
    }

    #[test]
    fn entry_age() {
        let entry = CacheEntry {
            key: "market_overview".to_string(),
            payload: serde_json::json!({}),
            stored_at: 1_000,
        };
        assert_eq!(entry.age_millis(4_500), Some(3_500));
        assert_eq!(entry.age_millis(500), None);
    }

    #[test]
    fn corrupt_timestamp_does_not_overflow() {
        let entry = CacheEntry {
            key: "golden_key".to_string(),
            payload: serde_json::json!({}),
            stored_at: i64::MIN,
        };
        assert_eq!(entry.age_millis(1_700_000_000_000), Some(i64::MAX));
    }
}
