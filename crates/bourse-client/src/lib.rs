pub mod auth;
pub mod client;
pub mod datasets;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod overlay;
pub mod transport;

pub mod test_support;

pub use auth::AuthSession;
pub use client::BourseClient;
pub use datasets::{
    FullAnalysis, LoginOutcome, RegistrationOutcome, SymbolEndpoint, DEFAULT_PERIOD_TYPE,
    DEFAULT_SIGNAL_SOURCE,
};
pub use error::ApiError;
pub use executor::{ApiClient, ApiReply, ApiRequest};
pub use fetch::{cached_fetch, Dataset};
pub use overlay::{apply_predictions, PredictionOverlay};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
