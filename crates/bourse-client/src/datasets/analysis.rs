use bourse_models::{Fetched, MarketSummary, PredictionSet};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;

use super::stock_history::normalize_symbol;

/// Per-symbol analysis endpoints. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolEndpoint {
    Fundamental,
    Technical,
    MlPrediction,
    Sentiment,
    HistoricalData,
}

impl SymbolEndpoint {
    pub const ALL: [SymbolEndpoint; 5] = [
        Self::Fundamental,
        Self::Technical,
        Self::MlPrediction,
        Self::Sentiment,
        Self::HistoricalData,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Fundamental => "analysis/fundamental_data",
            Self::Technical => "analysis/analyze_technical_indicators",
            Self::MlPrediction => "analysis/ml_prediction",
            Self::Sentiment => "analysis/market_sentiment",
            Self::HistoricalData => "analysis/historical-data",
        }
    }
}

/// Everything known about one symbol, plus the market-wide context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullAnalysis {
    pub symbol: String,
    pub fundamental_data: Value,
    pub technical_data: Value,
    pub ml_prediction: Value,
    pub sentiment_data: Value,
    pub historical_data: Value,
    pub market_summary: Fetched<MarketSummary>,
    pub general_ml_predictions: Fetched<PredictionSet>,
}

impl BourseClient {
    /// Raw analysis for `symbol`, or `{}` on any failure.
    pub async fn fetch_symbol_analysis(&self, endpoint: SymbolEndpoint, symbol: &str) -> Value {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            warn!(endpoint = endpoint.path(), "Analysis requested without a symbol");
            return Value::Object(Default::default());
        }
        let request = ApiRequest::get(endpoint.path())
            .segment(symbol)
            .trailing_slash();
        match self.api().call(request).await {
            Ok(reply) => reply.payload_or_empty(),
            Err(e) => {
                warn!(endpoint = endpoint.path(), error = %e, "Analysis request failed");
                Value::Object(Default::default())
            }
        }
    }

    pub async fn fetch_fundamental_data(&self, symbol: &str) -> Value {
        self.fetch_symbol_analysis(SymbolEndpoint::Fundamental, symbol)
            .await
    }

    pub async fn fetch_technical_indicators(&self, symbol: &str) -> Value {
        self.fetch_symbol_analysis(SymbolEndpoint::Technical, symbol)
            .await
    }

    pub async fn fetch_ml_prediction(&self, symbol: &str) -> Value {
        self.fetch_symbol_analysis(SymbolEndpoint::MlPrediction, symbol)
            .await
    }

    pub async fn fetch_sentiment(&self, symbol: &str) -> Value {
        self.fetch_symbol_analysis(SymbolEndpoint::Sentiment, symbol)
            .await
    }

    pub async fn fetch_historical_data(&self, symbol: &str) -> Value {
        self.fetch_symbol_analysis(SymbolEndpoint::HistoricalData, symbol)
            .await
    }

    /// Fan out the five per-symbol calls together with the market summary
    /// and prediction list. Only a missing symbol is an error.
    pub async fn fetch_full_analysis(&self, symbol: &str) -> Result<FullAnalysis, ApiError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ApiError::InvalidRequest(
                "symbol is required for full analysis".to_string(),
            ));
        }

        let (
            fundamental_data,
            technical_data,
            ml_prediction,
            sentiment_data,
            historical_data,
            market_summary,
            general_ml_predictions,
        ) = tokio::join!(
            self.fetch_fundamental_data(&symbol),
            self.fetch_technical_indicators(&symbol),
            self.fetch_ml_prediction(&symbol),
            self.fetch_sentiment(&symbol),
            self.fetch_historical_data(&symbol),
            self.fetch_market_summary(false),
            self.fetch_ml_predictions(false),
        );

        Ok(FullAnalysis {
            symbol,
            fundamental_data,
            technical_data,
            ml_prediction,
            sentiment_data,
            historical_data,
            market_summary,
            general_ml_predictions,
        })
    }
}
