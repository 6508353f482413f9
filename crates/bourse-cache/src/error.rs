use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage quota exceeded: limit={limit} entries")]
    QuotaExceeded { limit: usize },

    #[error("Store not available: {0}")]
    Unavailable(String),
}
