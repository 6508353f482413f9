use bourse_models::{
    dataset, Fetched, GoldenKey, GoldenKeyStock, PotentialQueues, PredictionSet, WeeklyWatchlist,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::fetch::cached_fetch;
use crate::overlay::apply_predictions;

const WATCHLIST_ENDPOINT: &str = "weekly_watchlist/results";
const GOLDEN_KEY_ENDPOINT: &str = "golden_key/results";
const QUEUES_ENDPOINT: &str = "potential_queues/results";

impl BourseClient {
    /// Weekly watchlist with ML outlooks overlaid by `symbol_name`.
    pub async fn fetch_weekly_watchlist(&self, force_refresh: bool) -> Fetched<WeeklyWatchlist> {
        cached_fetch(self.cache(), dataset::WEEKLY_WATCHLIST, force_refresh, || async move {
            let (raw, predictions) = tokio::join!(
                self.api().get_json(ApiRequest::get(WATCHLIST_ENDPOINT)),
                self.overlay_predictions(force_refresh),
            );
            let mut watchlist = parse_watchlist(raw?)?;
            let matched = apply_predictions(&mut watchlist.top_watchlist_stocks, &predictions);
            debug!(
                stocks = watchlist.top_watchlist_stocks.len(),
                matched, "Merged watchlist predictions"
            );
            Ok(watchlist)
        })
        .await
    }

    /// Golden-key screener with ML outlooks overlaid by `symbol`.
    pub async fn fetch_golden_key(&self, force_refresh: bool) -> Fetched<GoldenKey> {
        cached_fetch(self.cache(), dataset::GOLDEN_KEY, force_refresh, || async move {
            let (raw, predictions) = tokio::join!(
                self.api().get_json(ApiRequest::get(GOLDEN_KEY_ENDPOINT)),
                self.overlay_predictions(force_refresh),
            );
            let mut golden_key = parse_golden_key(raw?)?;
            let matched = apply_predictions(&mut golden_key.results, &predictions);
            debug!(
                stocks = golden_key.results.len(),
                matched, "Merged golden key predictions"
            );
            Ok(golden_key)
        })
        .await
    }

    pub async fn fetch_potential_queues(&self, force_refresh: bool) -> Fetched<PotentialQueues> {
        cached_fetch(self.cache(), dataset::POTENTIAL_QUEUES, force_refresh, || async move {
            let raw = self.api().get_json(ApiRequest::get(QUEUES_ENDPOINT)).await?;
            parse_potential_queues(raw)
        })
        .await
    }

    /// Predictions for an overlay. Only fresh data is used; a failed or
    /// stale prediction fetch leaves the rule-based outlooks in place.
    async fn overlay_predictions(&self, force_refresh: bool) -> PredictionSet {
        let fetched = self.fetch_ml_predictions(force_refresh).await;
        if fetched.stale {
            warn!("Predictions are stale, keeping rule-based outlooks");
            return PredictionSet::default();
        }
        fetched.data
    }
}

pub fn parse_watchlist(raw: Value) -> Result<WeeklyWatchlist, ApiError> {
    require_array(&raw, "top_watchlist_stocks")?;
    Ok(serde_json::from_value(raw)?)
}

/// The backend lists golden-key rows under `top_stocks`.
pub fn parse_golden_key(raw: Value) -> Result<GoldenKey, ApiError> {
    let rows = require_array(&raw, "top_stocks")?;
    let results = rows
        .iter()
        .cloned()
        .map(serde_json::from_value::<GoldenKeyStock>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GoldenKey {
        results,
        last_updated: raw.get("last_updated").cloned().unwrap_or_default(),
    })
}

pub fn parse_potential_queues(raw: Value) -> Result<PotentialQueues, ApiError> {
    require_array(&raw, "top_queues")?;
    Ok(serde_json::from_value(raw)?)
}

fn require_array<'a>(raw: &'a Value, field: &str) -> Result<&'a Vec<Value>, ApiError> {
    raw.get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Shape(format!("expected a `{field}` list")))
}
