use bourse_models::{dataset, Fetched, MarketSummary, SummaryKind};
use serde_json::Value;
use tracing::info;

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;

const ENDPOINT: &str = "analysis/market-summary";

impl BourseClient {
    /// Daily sentiment or weekly indices analysis. A backend status reply
    /// (e.g. "market closed") is returned but not cached.
    pub async fn fetch_market_summary(&self, force_refresh: bool) -> Fetched<MarketSummary> {
        cached_fetch(self.cache(), dataset::MARKET_SUMMARY, force_refresh, || async move {
            let raw = self.api().get_json(ApiRequest::get(ENDPOINT)).await?;
            classify_summary(raw)
        })
        .await
    }
}

pub fn classify_summary(raw: Value) -> Result<MarketSummary, ApiError> {
    let Value::Object(fields) = raw else {
        return Err(ApiError::Shape("market summary must be an object".to_string()));
    };
    let kind = SummaryKind::classify(&fields).ok_or_else(|| {
        ApiError::Shape("market summary has neither sentiment nor indices data".to_string())
    })?;
    if kind == SummaryKind::Status {
        info!(
            status = ?fields.get("status"),
            message = ?fields.get("message"),
            "Backend reported market summary status"
        );
    }
    Ok(MarketSummary { kind, fields })
}
