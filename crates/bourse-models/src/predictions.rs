use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// ML outlook per symbol, reduced from the backend's flat prediction list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictionSet {
    /// Symbol → predicted trend label (e.g., "Bullish").
    pub predictions: BTreeMap<String, String>,
    pub last_updated: Option<String>,
}

impl PredictionSet {
    pub fn outlook_for(&self, symbol: &str) -> Option<&str> {
        self.predictions.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_symbol() {
        let mut set = PredictionSet::default();
        set.predictions
            .insert("FOO".to_string(), "Bullish".to_string());
        assert_eq!(set.outlook_for("FOO"), Some("Bullish"));
        assert_eq!(set.outlook_for("BAR"), None);
        assert_eq!(set.len(), 1);
    }
}
