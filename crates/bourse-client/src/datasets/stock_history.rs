use bourse_models::{dataset, FetchError, Fetched, HistoryQuery, StockHistory};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;

const ENDPOINT: &str = "analysis/stock-history";

impl BourseClient {
    /// Daily history for one symbol. An explicit date range wins over a
    /// day count; rows come back in backend order.
    pub async fn fetch_stock_history(
        &self,
        symbol: &str,
        query: &HistoryQuery,
        force_refresh: bool,
    ) -> Fetched<StockHistory> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            warn!("Stock history requested without a symbol");
            return Fetched {
                error: Some(FetchError::Message(
                    "Symbol is required to fetch stock history.".to_string(),
                )),
                ..Fetched::unavailable(StockHistory::default())
            };
        }

        let range = query.resolve();
        let key = dataset::stock_history(&symbol, &range.cache_tag());
        cached_fetch(self.cache(), &key, force_refresh, || async move {
            debug!(symbol = %symbol, range = ?range, "Fetching stock history");
            let request = ApiRequest::get(ENDPOINT)
                .segment(symbol.as_str())
                .queries(range.query_params());
            let raw = self.api().get_json(request).await?;
            parse_history(raw)
        })
        .await
    }
}

/// Trimmed and upper-cased, the way the backend indexes symbols.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub fn parse_history(raw: Value) -> Result<StockHistory, ApiError> {
    match raw {
        Value::Object(mut body) => match body.remove("history") {
            Some(Value::Array(history)) => Ok(StockHistory { history }),
            _ => Err(ApiError::Shape("expected a `history` list".to_string())),
        },
        _ => Err(ApiError::Shape("stock history must be an object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn history_order_is_preserved() {
        let history = parse_history(json!({
            "history": [{"date": "2024-03-02"}, {"date": "2024-03-01"}]
        }))
        .unwrap();
        assert_eq!(history.history[0]["date"], json!("2024-03-02"));
    }

    #[test]
    fn missing_history_fails() {
        assert!(parse_history(json!({"message": "no data"})).is_err());
        assert!(parse_history(json!({"history": {}})).is_err());
    }

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol("  foo "), "FOO");
        assert_eq!(normalize_symbol("فولاد"), "فولاد");
    }
}
