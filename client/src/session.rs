use crate::error::{ClientError, ClientResult};
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_KEY};
use common::{AuthResponse, Session, User};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owner of the global session.
///
/// Keeps the in-memory session and its persisted copy (token and serialized
/// user under two keys) in step. Nothing else writes those keys.
pub struct SessionManager<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    state: RwLock<Option<Session>>,
}

impl<S: KeyValueStore + ?Sized> SessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: RwLock::new(None),
        }
    }

    /// Load a previously persisted session.
    ///
    /// Only restores when both entries are present and the user parses. A
    /// corrupt user entry wipes both entries.
    pub async fn restore(&self) -> ClientResult<Option<Session>> {
        let token = self.store.get(TOKEN_KEY).await?;
        let user = self.store.get(USER_KEY).await?;

        let session = match (token, user) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Some(Session { token, user }),
                Err(e) => {
                    tracing::warn!("Discarding unreadable stored user: {}", e);
                    self.store.remove_many(&[TOKEN_KEY, USER_KEY]).await?;
                    None
                }
            },
            _ => None,
        };

        if let Some(session) = &session {
            tracing::info!("Restored session for {}", session.user.email);
        }

        *self.state.write().await = session.clone();
        Ok(session)
    }

    /// Persist a fresh login/registration and make it current
    pub async fn establish(&self, auth: AuthResponse) -> ClientResult<Session> {
        let session = Session::from(auth);
        let user_json = serde_json::to_string(&session.user)?;

        self.store
            .set_many(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user_json.as_str())])
            .await?;

        *self.state.write().await = Some(session.clone());
        tracing::info!("Session established for {}", session.user.email);
        Ok(session)
    }

    /// Log out. In-memory state is reset even if storage fails.
    pub async fn clear(&self) -> ClientResult<()> {
        *self.state.write().await = None;

        if let Err(e) = self.store.remove_many(&[TOKEN_KEY, USER_KEY]).await {
            tracing::error!("Failed to remove stored session: {}", e);
            return Err(e);
        }

        tracing::info!("Session cleared");
        Ok(())
    }

    /// Replace the stored profile after a refresh
    pub async fn update_user(&self, user: User) -> ClientResult<()> {
        let mut state = self.state.write().await;
        let session = state.as_mut().ok_or(ClientError::AuthRequired)?;

        self.store
            .set(USER_KEY, &serde_json::to_string(&user)?)
            .await?;
        session.user = user;
        Ok(())
    }

    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Token for an authenticated call, or `AuthRequired`
    pub async fn require_token(&self) -> ClientResult<String> {
        self.token().await.ok_or(ClientError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Store whose writes always fail, wrapped around real entries
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> ClientResult<Option<String>> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> ClientResult<()> {
            Err(ClientError::Storage("read-only".to_string()))
        }

        async fn set_many(&self, _entries: &[(&str, &str)]) -> ClientResult<()> {
            Err(ClientError::Storage("read-only".to_string()))
        }

        async fn remove(&self, key: &str) -> ClientResult<()> {
            self.0.remove(key).await
        }

        async fn remove_many(&self, keys: &[&str]) -> ClientResult<()> {
            self.0.remove_many(keys).await
        }
    }

    fn auth_response() -> AuthResponse {
        AuthResponse {
            token: "tok-1".to_string(),
            user: User {
                user_id: 1,
                email: "kim@example.com".to_string(),
                nickname: "kim".to_string(),
                created_at: None,
            },
        }
    }

    #[tokio::test]
    async fn test_establish_persists_both_entries() {
        let store = MemoryStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()));

        manager.establish(auth_response()).await.unwrap();

        assert!(manager.is_authenticated().await);
        assert_eq!(store.peek(TOKEN_KEY).as_deref(), Some("tok-1"));
        let stored: User = serde_json::from_str(&store.peek(USER_KEY).unwrap()).unwrap();
        assert_eq!(stored.nickname, "kim");
    }

    #[tokio::test]
    async fn test_restore_requires_both_entries() {
        let store = MemoryStore::new();
        store.insert(TOKEN_KEY, "tok-1");
        let manager = SessionManager::new(Arc::new(store.clone()));

        assert!(manager.restore().await.unwrap().is_none());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let store = MemoryStore::new();
        SessionManager::new(Arc::new(store.clone()))
            .establish(auth_response())
            .await
            .unwrap();

        let manager = SessionManager::new(Arc::new(store));
        let session = manager.restore().await.unwrap().unwrap();

        assert_eq!(session.token, "tok-1");
        assert_eq!(session.user.email, "kim@example.com");
        assert_eq!(manager.require_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_user() {
        let store = MemoryStore::new();
        store.insert(TOKEN_KEY, "tok-1");
        store.insert(USER_KEY, "{broken");
        let manager = SessionManager::new(Arc::new(store.clone()));

        assert!(manager.restore().await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = MemoryStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()));
        manager.establish(auth_response()).await.unwrap();

        manager.clear().await.unwrap();

        assert!(!manager.is_authenticated().await);
        assert!(store.is_empty());
        assert!(matches!(
            manager.require_token().await,
            Err(ClientError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn test_update_user_requires_session() {
        let manager = SessionManager::new(Arc::new(MemoryStore::new()));
        let err = manager.update_user(auth_response().user).await.unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired));
    }

    #[tokio::test]
    async fn test_update_user_replaces_profile() {
        let store = MemoryStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()));
        manager.establish(auth_response()).await.unwrap();

        let mut user = auth_response().user;
        user.nickname = "kimmy".to_string();
        manager.update_user(user).await.unwrap();

        assert_eq!(manager.user().await.unwrap().nickname, "kimmy");
        assert!(store.peek(USER_KEY).unwrap().contains("kimmy"));
    }

    #[tokio::test]
    async fn test_failed_establish_keeps_previous_pair() {
        let inner = MemoryStore::new();
        SessionManager::new(Arc::new(inner.clone()))
            .establish(auth_response())
            .await
            .unwrap();

        let manager = SessionManager::new(Arc::new(ReadOnlyStore(inner.clone())));
        manager.restore().await.unwrap();

        let mut next = auth_response();
        next.token = "tok-2".to_string();
        next.user.email = "lee@example.com".to_string();
        let err = manager.establish(next).await.unwrap_err();

        assert!(matches!(err, ClientError::Storage(_)));
        assert_eq!(inner.peek(TOKEN_KEY).as_deref(), Some("tok-1"));
        assert!(inner.peek(USER_KEY).unwrap().contains("kim@example.com"));
        assert_eq!(manager.token().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_recovers_from_corrupt_session_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{truncated").unwrap();
        let manager = SessionManager::new(Arc::new(FileStore::new(&path)));

        assert!(manager.restore().await.unwrap().is_none());
        manager.establish(auth_response()).await.unwrap();
        assert_eq!(manager.require_token().await.unwrap(), "tok-1");
        manager.clear().await.unwrap();

        let reopened = SessionManager::new(Arc::new(FileStore::new(&path)));
        assert!(reopened.restore().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_works_behind_trait_object() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let manager: SessionManager<dyn KeyValueStore> = SessionManager::new(store);

        manager.establish(auth_response()).await.unwrap();
        assert_eq!(manager.token().await.as_deref(), Some("tok-1"));
    }
}
