//! Bourse - cached client for the Tehran exchange dashboard backend
//!
//! Fetches market overview, screener results, signal performance, market
//! summaries and stock history, keeping the last good copy of each dataset
//! in a local SQLite store so a flaky backend degrades to stale data
//! instead of errors.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! use bourse::models::BourseConfig;
//!
//! let client = bourse::build_client(&BourseConfig::default()).await?;
//! let watchlist = client.fetch_weekly_watchlist(false).await;
//! println!("{}", serde_json::to_string(&watchlist)?);
//! # Ok(())
//! # }
//! ```

pub use bourse_cache as cache;
pub use bourse_client as client;
pub use bourse_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bourse_cache::{CachePolicy, CacheStore, MemoryStore, SqliteStore, SystemClock, TtlPolicy};
use bourse_client::{ApiClient, AuthSession, BourseClient, ReqwestTransport};
use bourse_models::BourseConfig;

/// Build a client from configuration.
///
/// The SQLite file holds both cached datasets and the remembered auth
/// token; the session-scoped token lives in memory for this process only.
pub async fn build_client(config: &BourseConfig) -> Result<BourseClient, anyhow::Error> {
    let sqlite_path = &config.cache.sqlite_path;
    if let Some(parent) = Path::new(sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }
    }
    let persistent = Arc::new(
        SqliteStore::open(sqlite_path)
            .with_context(|| format!("Failed to open cache store: {sqlite_path}"))?,
    );
    let session_store = Arc::new(MemoryStore::new());

    let session = Arc::new(AuthSession::restore(persistent.clone(), session_store).await);
    let transport = ReqwestTransport::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_seconds),
    )
    .context("Failed to build HTTP transport")?;
    let api = ApiClient::new(Arc::new(transport), session);

    let store = Arc::new(CacheStore::new(
        persistent,
        config.cache.memory_max_capacity,
        Arc::new(SystemClock),
    ));
    let policy = CachePolicy::new(store, TtlPolicy::from_config(&config.cache.ttl));

    Ok(BourseClient::new(api, policy))
}
