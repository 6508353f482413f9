use bourse_models::{GoldenKeyStock, PredictionSet, WatchlistStock};
use serde_json::Value;

/// Outlook shown when neither a prediction nor a rule-based value exists.
pub const UNKNOWN_OUTLOOK: &str = "نامشخص";

/// A screener row that can carry an ML outlook.
pub trait PredictionOverlay {
    /// The symbol used to look the row up in a [`PredictionSet`]. Rows
    /// without a text symbol never match.
    fn join_key(&self) -> Option<&str>;

    /// Replace the outlook with a model prediction.
    fn apply_prediction(&mut self, outlook: &str);

    /// Keep the screener's own outlook, marking it as not model-derived.
    fn keep_rule_based(&mut self);
}

impl PredictionOverlay for WatchlistStock {
    fn join_key(&self) -> Option<&str> {
        self.symbol_name.as_str()
    }

    fn apply_prediction(&mut self, outlook: &str) {
        self.outlook = Value::from(outlook);
        self.ml_source = true;
    }

    fn keep_rule_based(&mut self) {
        self.ml_source = false;
    }
}

impl PredictionOverlay for GoldenKeyStock {
    fn join_key(&self) -> Option<&str> {
        self.symbol.as_str()
    }

    fn apply_prediction(&mut self, outlook: &str) {
        self.outlook = Value::from(outlook);
        self.ml_source = true;
    }

    fn keep_rule_based(&mut self) {
        if self.outlook.is_null() {
            self.outlook = if is_truthy(&self.status) {
                self.status.clone()
            } else {
                Value::from(UNKNOWN_OUTLOOK)
            };
        }
        self.ml_source = false;
    }
}

/// Overlay predictions onto `items` by symbol. Returns the number of rows
/// that took a model outlook.
pub fn apply_predictions<T: PredictionOverlay>(items: &mut [T], predictions: &PredictionSet) -> usize {
    let mut matched = 0;
    for item in items.iter_mut() {
        let prediction = item
            .join_key()
            .filter(|key| !key.is_empty())
            .and_then(|key| predictions.outlook_for(key))
            .map(str::to_string);
        match prediction {
            Some(outlook) => {
                item.apply_prediction(&outlook);
                matched += 1;
            }
            None => item.keep_rule_based(),
        }
    }
    matched
}

// Empty strings, zero and `false` count as no status at all.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
