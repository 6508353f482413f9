use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::error::CacheError;
use crate::store::KeyValueStore;

/// Durable key/value store on a single SQLite file.
///
/// This is the long-lived medium: cached datasets and the remembered auth
/// token survive restarts. Access is serialized through a `Mutex` since
/// `rusqlite::Connection` is not `Sync`, which also makes multi-key reads
/// and writes consistent with each other.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store file. Creates the schema and enables WAL.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(bourse_models::cache_schema::KV_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(bourse_models::cache_schema::KV_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Count all entries in the store.
    pub fn count(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn select_value(conn: &Connection, key: &str) -> Result<Option<String>, CacheError> {
    let mut stmt = conn.prepare_cached("SELECT value FROM kv_entries WHERE key = ?1")?;
    let value = stmt
        .query_row(rusqlite::params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock()?;
        select_value(&conn, key)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, CacheError> {
        let conn = self.lock()?;
        keys.iter().map(|key| select_value(&conn, key)).collect()
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        let mut conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)",
            )?;
            for (key, value) in entries {
                stmt.execute(rusqlite::params![key, value, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM kv_entries WHERE key = ?1",
            rusqlite::params![key],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[tokio::test]
    async fn set_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("auth_token", "abc").await.unwrap();

        assert_eq!(store.get("auth_token").await.unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn get_missing_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_many_writes_all_keys() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set_many(&[
                pair("api_cache_golden_key", r#"{"results":[]}"#),
                pair("api_timestamp_golden_key", "1700000000000"),
            ])
            .await
            .unwrap();

        let values = store
            .get_many(&["api_cache_golden_key", "api_timestamp_golden_key", "other"])
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![
                Some(r#"{"results":[]}"#.to_string()),
                Some("1700000000000".to_string()),
                None
            ]
        );
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn set_replaces_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("auth_token", "old").await.unwrap();
        store.set("auth_token", "new").await.unwrap();

        assert_eq!(store.get("auth_token").await.unwrap(), Some("new".to_string()));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("auth_token", "abc").await.unwrap();
        store.remove("auth_token").await.unwrap();
        store.remove("never_written").await.unwrap();

        assert_eq!(store.get("auth_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bourse_cache.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.set("auth_remember", "true").await.unwrap();
        }

        let reopened = SqliteStore::open(path).unwrap();
        assert_eq!(
            reopened.get("auth_remember").await.unwrap(),
            Some("true".to_string())
        );
    }
}
