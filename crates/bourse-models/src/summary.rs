use serde::{Deserialize, Serialize};

const UNAVAILABLE_MESSAGE: &str = "Failed to load market summary data due to API error.";

/// Which of the backend's market summary shapes a response has.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Daily analysis, identified by a `sentiment` field.
    DailySentiment,
    /// Weekly analysis, identified by `indices_data` or `smart_money_flow_text`.
    WeeklyIndices,
    /// Backend-reported error or info (`status` other than `"success"`).
    Status,
    /// No data could be loaded.
    Unavailable,
}

impl SummaryKind {
    /// Classify a raw response object. `None` means the shape is not recognised.
    pub fn classify(body: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        if body.contains_key("sentiment") {
            return Some(Self::DailySentiment);
        }
        if body.contains_key("indices_data") || body.contains_key("smart_money_flow_text") {
            return Some(Self::WeeklyIndices);
        }
        match body.get("status") {
            Some(status) if status.as_str() != Some("success") => Some(Self::Status),
            _ => None,
        }
    }
}

/// Market-wide analysis text and figures, kept in the backend's own shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSummary {
    #[serde(rename = "_shape")]
    pub kind: SummaryKind,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl MarketSummary {
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(|m| m.as_str())
    }
}

impl Default for MarketSummary {
    fn default() -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("sentiment".to_string(), serde_json::Value::Null);
        fields.insert("indices_data".to_string(), serde_json::Value::Null);
        fields.insert(
            "message".to_string(),
            serde_json::Value::String(UNAVAILABLE_MESSAGE.to_string()),
        );
        Self {
            kind: SummaryKind::Unavailable,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn classify_daily() {
        let body = object(serde_json::json!({"sentiment": "مثبت", "status": "success"}));
        assert_eq!(SummaryKind::classify(&body), Some(SummaryKind::DailySentiment));
    }

    #[test]
    fn classify_weekly() {
        let body = object(serde_json::json!({"smart_money_flow_text": "..."}));
        assert_eq!(SummaryKind::classify(&body), Some(SummaryKind::WeeklyIndices));
        let body = object(serde_json::json!({"indices_data": {}}));
        assert_eq!(SummaryKind::classify(&body), Some(SummaryKind::WeeklyIndices));
    }

    #[test]
    fn classify_status() {
        let body = object(serde_json::json!({"status": "info", "message": "market closed"}));
        assert_eq!(SummaryKind::classify(&body), Some(SummaryKind::Status));
    }

    #[test]
    fn classify_unrecognised() {
        assert_eq!(SummaryKind::classify(&serde_json::Map::new()), None);
        let body = object(serde_json::json!({"status": "success"}));
        assert_eq!(SummaryKind::classify(&body), None);
    }

    #[test]
    fn default_keeps_both_shapes_addressable() {
        let json = serde_json::to_value(MarketSummary::default()).unwrap();
        assert_eq!(json["_shape"], serde_json::json!("unavailable"));
        assert_eq!(json["sentiment"], serde_json::Value::Null);
        assert_eq!(json["indices_data"], serde_json::Value::Null);
        assert!(MarketSummary::default().message().is_some());
    }
}
