use bourse_models::{dataset, Fetched, PredictionSet};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;

const ENDPOINT: &str = "analysis/ml-predictions";

impl BourseClient {
    /// Symbol → predicted trend, used to overlay screener outlooks.
    pub async fn fetch_ml_predictions(&self, force_refresh: bool) -> Fetched<PredictionSet> {
        let now = self.now();
        cached_fetch(self.cache(), dataset::ML_PREDICTIONS, force_refresh, || async move {
            let raw = self.api().get_json(ApiRequest::get(ENDPOINT)).await?;
            reduce_predictions(&raw, now)
        })
        .await
    }
}

/// Reduce the flat prediction list to a lookup map.
///
/// Rows are keyed by `symbol`, falling back to `symbol_name`; rows with
/// no usable key or no `predicted_trend` are left out.
pub fn reduce_predictions(raw: &Value, now: DateTime<Utc>) -> Result<PredictionSet, ApiError> {
    let rows = raw
        .as_array()
        .ok_or_else(|| ApiError::Shape("ML predictions must be a list".to_string()))?;

    let predictions = rows
        .iter()
        .filter_map(|row| {
            let key = non_empty(row, "symbol").or_else(|| non_empty(row, "symbol_name"))?;
            let trend = non_empty(row, "predicted_trend")?;
            Some((key.to_string(), trend.to_string()))
        })
        .collect();

    Ok(PredictionSet {
        predictions,
        last_updated: Some(now.to_rfc3339()),
    })
}

fn non_empty<'a>(row: &'a Value, field: &str) -> Option<&'a str> {
    row.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_by_symbol_then_symbol_name() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let raw = json!([
            {"symbol": "FOO", "symbol_name": "Foo Co", "predicted_trend": "Bullish"},
            {"symbol_name": "BAR", "predicted_trend": "Bearish"},
            {"symbol": "", "symbol_name": "BAZ", "predicted_trend": "Neutral"},
            {"symbol": "NOPE"},
            {"predicted_trend": "Bullish"},
            {"symbol": "EMPTY", "predicted_trend": ""}
        ]);
        let set = reduce_predictions(&raw, now).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.outlook_for("FOO"), Some("Bullish"));
        assert_eq!(set.outlook_for("BAR"), Some("Bearish"));
        assert_eq!(set.outlook_for("BAZ"), Some("Neutral"));
        assert_eq!(set.outlook_for("NOPE"), None);
        assert_eq!(set.last_updated.as_deref(), Some("2024-01-01T00:00:00+00:00"));
    }

    #[test]
    fn object_response_is_rejected() {
        let now = Utc::now();
        assert!(matches!(
            reduce_predictions(&json!({"predictions": []}), now),
            Err(ApiError::Shape(_))
        ));
    }
}
