//! One module per backend dataset. Every fetcher is an inherent method on
//! [`BourseClient`](crate::client::BourseClient).

pub mod account;
pub mod analysis;
pub mod market_overview;
pub mod market_summary;
pub mod performance;
pub mod predictions;
pub mod screeners;
pub mod stock_history;

pub use account::{LoginOutcome, RegistrationOutcome};
pub use analysis::{FullAnalysis, SymbolEndpoint};
pub use performance::{DEFAULT_PERIOD_TYPE, DEFAULT_SIGNAL_SOURCE};
