use std::sync::{Arc, RwLock};

use bourse_cache::KeyValueStore;
use bourse_models::cache_schema::key_patterns::{AUTH_REMEMBER, AUTH_TOKEN};
use tracing::{info, warn};

/// Owner of the current bearer token.
///
/// The in-memory copy is authoritative. It is mirrored into the long-lived
/// store when "remember me" is set and into the session store otherwise;
/// the other location is cleared so only one mirror exists at a time.
pub struct AuthSession {
    token: RwLock<Option<String>>,
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl AuthSession {
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            token: RwLock::new(None),
            persistent,
            session,
        }
    }

    /// Build a session seeded from whichever mirror holds a token.
    pub async fn restore(
        persistent: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Self {
        let auth = Self::new(persistent, session);
        let stored = auth.stored_token().await;
        if stored.is_some() {
            info!("Restored auth token from storage");
        }
        auth.replace(stored);
        auth
    }

    fn replace(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    /// The in-memory token.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub async fn remember_me(&self) -> bool {
        match self.persistent.get(AUTH_REMEMBER).await {
            Ok(flag) => flag.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read remember-me flag");
                false
            }
        }
    }

    pub async fn set_remember_me(&self, remember: bool) {
        let value = if remember { "true" } else { "false" };
        if let Err(e) = self.persistent.set(AUTH_REMEMBER, value).await {
            warn!(error = %e, "Failed to store remember-me flag");
        }
    }

    /// Install a new token (after login or refresh) and move the mirror to
    /// the location the remember-me flag selects.
    pub async fn set_token(&self, token: &str) {
        self.replace(Some(token.to_string()));

        let (keep, stale) = if self.remember_me().await {
            (&self.persistent, &self.session)
        } else {
            (&self.session, &self.persistent)
        };
        if let Err(e) = keep.set(AUTH_TOKEN, token).await {
            warn!(error = %e, "Failed to mirror auth token");
        }
        if let Err(e) = stale.remove(AUTH_TOKEN).await {
            warn!(error = %e, "Failed to remove stale auth token mirror");
        }
        info!("Auth token updated");
    }

    /// Forget the token everywhere, including the remember-me preference.
    pub async fn clear(&self) {
        self.replace(None);
        for (store, key) in [
            (&self.persistent, AUTH_TOKEN),
            (&self.session, AUTH_TOKEN),
            (&self.persistent, AUTH_REMEMBER),
        ] {
            if let Err(e) = store.remove(key).await {
                warn!(key, error = %e, "Failed to clear auth storage");
            }
        }
        info!("Auth token cleared");
    }

    /// Token for an outgoing request: explicit override, then storage
    /// (long-lived before session), then memory.
    pub async fn resolve_token(&self, override_token: Option<&str>) -> Option<String> {
        if let Some(token) = override_token.filter(|t| !t.is_empty()) {
            return Some(token.to_string());
        }
        if let Some(token) = self.stored_token().await {
            return Some(token);
        }
        self.token()
    }

    async fn stored_token(&self) -> Option<String> {
        for store in [&self.persistent, &self.session] {
            match store.get(AUTH_TOKEN).await {
                Ok(Some(token)) if !token.is_empty() => return Some(token),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to read stored auth token"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_cache::MemoryStore;

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn token_goes_to_session_store_by_default() {
        let (persistent, session) = stores();
        let auth = AuthSession::new(persistent.clone(), session.clone());

        auth.set_token("abc").await;
        assert_eq!(auth.token(), Some("abc".to_string()));
        assert_eq!(session.get(AUTH_TOKEN).await.unwrap(), Some("abc".to_string()));
        assert_eq!(persistent.get(AUTH_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remember_me_moves_token_to_long_lived_store() {
        let (persistent, session) = stores();
        let auth = AuthSession::new(persistent.clone(), session.clone());

        auth.set_token("first").await;
        auth.set_remember_me(true).await;
        auth.set_token("second").await;

        assert_eq!(
            persistent.get(AUTH_TOKEN).await.unwrap(),
            Some("second".to_string())
        );
        assert_eq!(session.get(AUTH_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_prefers_long_lived_store() {
        let (persistent, session) = stores();
        persistent.set(AUTH_TOKEN, "remembered").await.unwrap();
        session.set(AUTH_TOKEN, "session").await.unwrap();

        let auth = AuthSession::restore(persistent, session).await;
        assert_eq!(auth.token(), Some("remembered".to_string()));
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn resolve_order() {
        let (persistent, session) = stores();
        let auth = AuthSession::new(persistent.clone(), session.clone());
        assert_eq!(auth.resolve_token(None).await, None);

        auth.replace(Some("memory".to_string()));
        assert_eq!(auth.resolve_token(None).await, Some("memory".to_string()));

        session.set(AUTH_TOKEN, "stored").await.unwrap();
        assert_eq!(auth.resolve_token(None).await, Some("stored".to_string()));

        assert_eq!(
            auth.resolve_token(Some("override")).await,
            Some("override".to_string())
        );
    }

    #[tokio::test]
    async fn clear_removes_every_copy() {
        let (persistent, session) = stores();
        let auth = AuthSession::new(persistent.clone(), session.clone());
        auth.set_remember_me(true).await;
        auth.set_token("abc").await;

        auth.clear().await;
        assert!(!auth.is_authenticated());
        assert!(persistent.is_empty());
        assert!(session.is_empty());
        assert_eq!(auth.resolve_token(None).await, None);
    }
}
