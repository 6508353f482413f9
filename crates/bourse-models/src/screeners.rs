use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Weekly watchlist with ML outlook merged in.
///
/// Row fields the backend does not type reliably are kept as raw JSON so a
/// single odd row never rejects the whole list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeeklyWatchlist {
    pub top_watchlist_stocks: Vec<WatchlistStock>,
    pub last_updated: Value,
}

/// A watchlist row. Joined to predictions by `symbol_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchlistStock {
    pub symbol_name: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub outlook: Value,
    #[serde(rename = "_ml_source", default, skip_serializing_if = "is_false")]
    pub ml_source: bool,
    /// Remaining backend fields, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl WatchlistStock {
    /// The outlook, when the backend sent it as text.
    pub fn outlook_label(&self) -> Option<&str> {
        self.outlook.as_str()
    }
}

/// Golden-key screener results with ML outlook merged in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoldenKey {
    pub results: Vec<GoldenKeyStock>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub last_updated: Value,
}

/// A golden-key row. Joined to predictions by `symbol`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoldenKeyStock {
    pub symbol: Value,
    /// Rule-based status from the backend.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub status: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub outlook: Value,
    #[serde(rename = "_ml_source", default, skip_serializing_if = "is_false")]
    pub ml_source: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl GoldenKeyStock {
    pub fn outlook_label(&self) -> Option<&str> {
        self.outlook.as_str()
    }
}

/// Potential buy-queue candidates, passed through without a merge step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PotentialQueues {
    pub top_queues: Vec<Value>,
    /// Names of the technical filters that were active for this run.
    pub technical_filters: Vec<Value>,
    pub last_updated: Value,
}

fn is_false(value: &bool) -> bool {
    !*value
}
