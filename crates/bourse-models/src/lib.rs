pub mod cache_schema;
pub mod config;
pub mod envelope;
pub mod history;
pub mod overview;
pub mod performance;
pub mod predictions;
pub mod screeners;
pub mod summary;

pub use cache_schema::{dataset, CacheEntry};
pub use config::{ApiConfig, BourseConfig, CacheConfig, TtlConfig};
pub use envelope::{FetchError, Fetched};
pub use history::{HistoryQuery, HistoryRange, StockHistory};
pub use overview::{CommodityQuote, GlobalCommodities, IndexQuote, MarketOverview, PriceQuote};
pub use performance::AppPerformance;
pub use predictions::PredictionSet;
pub use screeners::{GoldenKey, GoldenKeyStock, PotentialQueues, WatchlistStock, WeeklyWatchlist};
pub use summary::{MarketSummary, SummaryKind};
