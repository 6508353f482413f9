use serde::{Deserialize, Serialize};

/// Signal performance for one period/source combination.
///
/// The aggregated half (`overall_performance`, `signals_by_source`,
/// `last_updated`) and the `signals_details` half come from separate
/// requests and may be empty independently of each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppPerformance {
    pub overall_performance: serde_json::Map<String, serde_json::Value>,
    pub signals_by_source: serde_json::Map<String, serde_json::Value>,
    pub last_updated: Option<String>,
    pub signals_details: Vec<serde_json::Value>,
}

impl AppPerformance {
    pub fn has_aggregated(&self) -> bool {
        !self.overall_performance.is_empty() || !self.signals_by_source.is_empty()
    }
}
