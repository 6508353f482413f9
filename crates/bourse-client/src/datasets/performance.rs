use bourse_models::{dataset, AppPerformance, Fetched};
use serde_json::Value;
use tracing::warn;

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;

const AGGREGATED_ENDPOINT: &str = "performance/aggregated";
const DETAILS_ENDPOINT: &str = "performance/signals-details";

pub const DEFAULT_PERIOD_TYPE: &str = "weekly";
pub const DEFAULT_SIGNAL_SOURCE: &str = "overall";

impl BourseClient {
    /// Aggregated signal performance plus the per-signal detail list,
    /// cached per period and source.
    ///
    /// The two halves are fetched concurrently and fail independently;
    /// only when both fail is the fetch treated as failed.
    pub async fn fetch_app_performance(
        &self,
        force_refresh: bool,
        period_type: &str,
        signal_source: &str,
    ) -> Fetched<AppPerformance> {
        let key = dataset::app_performance(period_type, signal_source);
        cached_fetch(self.cache(), &key, force_refresh, || async move {
            let aggregated_request = ApiRequest::get(AGGREGATED_ENDPOINT)
                .query("period_type", period_type)
                .query("signal_source", signal_source);
            let (aggregated, details) = tokio::join!(
                self.api().get_json(aggregated_request),
                self.api().get_json(ApiRequest::get(DETAILS_ENDPOINT)),
            );
            combine_performance(
                aggregated.and_then(parse_aggregated),
                details.and_then(parse_details),
            )
        })
        .await
    }
}

/// Merge the two halves, substituting an empty half for a failed one.
pub fn combine_performance(
    aggregated: Result<AppPerformance, ApiError>,
    details: Result<Vec<Value>, ApiError>,
) -> Result<AppPerformance, ApiError> {
    match (aggregated, details) {
        (Err(aggregated_err), Err(details_err)) => {
            warn!(error = %details_err, "Signal details failed");
            Err(aggregated_err)
        }
        (Ok(mut performance), Ok(details)) => {
            performance.signals_details = details;
            Ok(performance)
        }
        (Ok(performance), Err(e)) => {
            warn!(error = %e, "Signal details failed, keeping aggregated stats");
            Ok(performance)
        }
        (Err(e), Ok(details)) => {
            warn!(error = %e, "Aggregated stats failed, keeping signal details");
            Ok(AppPerformance {
                signals_details: details,
                ..AppPerformance::default()
            })
        }
    }
}

fn parse_aggregated(raw: Value) -> Result<AppPerformance, ApiError> {
    let Value::Object(body) = raw else {
        return Err(ApiError::Shape("aggregated performance must be an object".to_string()));
    };
    let object = |name: &str| match body.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Default::default(),
    };
    Ok(AppPerformance {
        overall_performance: object("overall_performance"),
        signals_by_source: object("signals_by_source"),
        last_updated: body
            .get("last_updated")
            .and_then(Value::as_str)
            .map(str::to_string),
        signals_details: Vec::new(),
    })
}

/// Details come back either as a bare list or wrapped in an object.
fn parse_details(raw: Value) -> Result<Vec<Value>, ApiError> {
    match raw {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut body) => ["signals_details", "signals"]
            .iter()
            .find_map(|field| match body.remove(*field) {
                Some(Value::Array(rows)) => Some(rows),
                _ => None,
            })
            .ok_or_else(|| ApiError::Shape("signal details list not found".to_string())),
        _ => Err(ApiError::Shape("signal details must be a list".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn transport_error() -> ApiError {
        ApiError::Transport("connection refused".to_string())
    }

    #[test]
    fn aggregated_failure_keeps_details() {
        let details = parse_details(json!([{"id": 1}, {"id": 2}]));
        let combined = combine_performance(Err(transport_error()), details).unwrap();
        assert!(!combined.has_aggregated());
        assert_eq!(combined.signals_details.len(), 2);
    }

    #[test]
    fn details_failure_keeps_aggregated() {
        let aggregated = parse_aggregated(json!({
            "overall_performance": {"win_rate": 0.61},
            "signals_by_source": {"golden_key": {"count": 4}},
            "last_updated": "2024-03-01"
        }));
        let combined = combine_performance(aggregated, Err(transport_error())).unwrap();
        assert_eq!(combined.overall_performance["win_rate"], json!(0.61));
        assert_eq!(combined.last_updated.as_deref(), Some("2024-03-01"));
        assert!(combined.signals_details.is_empty());
    }

    #[test]
    fn both_failing_is_a_failure() {
        assert!(combine_performance(Err(transport_error()), Err(transport_error())).is_err());
    }

    #[test]
    fn details_accept_wrapped_list() {
        assert_eq!(
            parse_details(json!({"signals_details": [{"id": 1}]})).unwrap().len(),
            1
        );
        assert_eq!(parse_details(json!({"signals": []})).unwrap().len(), 0);
        assert!(parse_details(json!({"message": "OK"})).is_err());
    }

    #[test]
    fn aggregated_missing_sections_default_empty() {
        let performance = parse_aggregated(json!({"overall_performance": null})).unwrap();
        assert!(performance.overall_performance.is_empty());
        assert!(parse_aggregated(json!([])).is_err());
    }
}
