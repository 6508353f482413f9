use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The `_error` marker: `true` when nothing usable could be returned, or the
/// failure message when a cached fallback is being served instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FetchError {
    Flag(bool),
    Message(String),
}

/// A dataset together with the metadata every fetcher reports.
///
/// Serializes as the dataset's own fields plus `_cached`, `_stale`,
/// `_error` and `_lastUpdate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fetched<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(rename = "_cached")]
    pub cached: bool,
    /// Only meaningful when `cached` is true.
    #[serde(rename = "_stale", default, skip_serializing_if = "is_false")]
    pub stale: bool,
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
    /// When the returned data was written, not when it was returned.
    #[serde(rename = "_lastUpdate")]
    pub last_update: Option<DateTime<Utc>>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

impl<T> Fetched<T> {
    /// Freshly fetched from the backend.
    pub fn fresh(data: T, fetched_at: i64) -> Self {
        Self {
            data,
            cached: false,
            stale: false,
            error: None,
            last_update: from_millis(fetched_at),
        }
    }

    /// Served from a cache entry that is still within its TTL.
    pub fn from_cache(data: T, stored_at: i64) -> Self {
        Self {
            data,
            cached: true,
            stale: false,
            error: None,
            last_update: from_millis(stored_at),
        }
    }

    /// Served from cache after a failed fetch.
    pub fn fallback(data: T, stored_at: i64, stale: bool, message: impl Into<String>) -> Self {
        Self {
            data,
            cached: true,
            stale,
            error: Some(FetchError::Message(message.into())),
            last_update: from_millis(stored_at),
        }
    }

    /// Nothing cached and the fetch failed.
    pub fn unavailable(data: T) -> Self {
        Self {
            data,
            cached: false,
            stale: false,
            error: Some(FetchError::Flag(true)),
            last_update: None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self.error, None | Some(FetchError::Flag(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
    struct Sample {
        items: Vec<u32>,
    }

    #[test]
    fn fresh_serializes_flat_without_error_fields() {
        let fetched = Fetched::fresh(Sample { items: vec![1, 2] }, 1_704_067_200_000);
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["items"], serde_json::json!([1, 2]));
        assert_eq!(json["_cached"], serde_json::json!(false));
        assert!(json.get("_stale").is_none());
        assert!(json.get("_error").is_none());
        assert_eq!(json["_lastUpdate"], serde_json::json!("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn fallback_carries_message() {
        let fetched = Fetched::fallback(Sample::default(), 0, true, "HTTP 502: Bad Gateway");
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["_cached"], serde_json::json!(true));
        assert_eq!(json["_stale"], serde_json::json!(true));
        assert_eq!(json["_error"], serde_json::json!("HTTP 502: Bad Gateway"));
        assert!(fetched.is_error());
    }

    #[test]
    fn unavailable_flags_error_true() {
        let fetched = Fetched::unavailable(Sample::default());
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["_error"], serde_json::json!(true));
        assert_eq!(json["_lastUpdate"], serde_json::Value::Null);
        assert!(!fetched.cached);
    }

    #[test]
    fn deserializes_both_error_forms() {
        let flagged: Fetched<Sample> = serde_json::from_value(serde_json::json!({
            "items": [], "_cached": false, "_error": true, "_lastUpdate": null
        }))
        .unwrap();
        assert_eq!(flagged.error, Some(FetchError::Flag(true)));

        let message: Fetched<Sample> = serde_json::from_value(serde_json::json!({
            "items": [3], "_cached": true, "_stale": true, "_error": "timeout",
            "_lastUpdate": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(message.error, Some(FetchError::Message("timeout".to_string())));
        assert!(message.stale);
    }
}
