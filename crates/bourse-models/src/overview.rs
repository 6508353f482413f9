use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Landing page snapshot: gold, coins, gold funds, exchange indices and
/// global metals, reshaped from the backend's price lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketOverview {
    pub gold: Vec<PriceQuote>,
    pub coin: Vec<PriceQuote>,
    pub funds: Vec<PriceQuote>,
    pub indices: Vec<IndexQuote>,
    pub global_commodities: GlobalCommodities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backend_update: Option<String>,
}

/// A single price-list entry with amounts converted to toman.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub title: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub price: Option<Decimal>,
    /// Percentage extracted from the `"(X.XX%) Y"` text.
    pub change_percent: Option<f64>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub change_value: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub last_update: Option<Decimal>,
    pub key: Option<String>,
}

/// An exchange index, passed through from the backend as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexQuote {
    pub key: String,
    pub title: String,
    pub value: serde_json::Value,
    pub change: serde_json::Value,
    pub percent: serde_json::Value,
    pub date: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlobalCommodities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<CommodityQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silver: Option<CommodityQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platinum: Option<CommodityQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copper: Option<CommodityQuote>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommodityQuote {
    pub title: String,
    pub value: serde_json::Value,
}
