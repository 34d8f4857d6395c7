use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::models::{SessionRecord, TwoFactorRecord, UserRecord};

use super::{CredentialStore, StoreError};

#[derive(Default)]
struct Collections {
    users: HashMap<String, UserRecord>,
    sessions: HashMap<String, SessionRecord>,
    two_factor: HashMap<String, TwoFactorRecord>,
}

/// HashMap-backed credential store for tests and local development.
///
/// Honors the same contract as the Postgres store, including treating the
/// 2FA record write and flag flip as one unit (a single lock guard covers
/// both maps, so no observer can see one without the other).
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session records held, across all users.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Overwrite a user record in place, for test setups that mutate state
    /// the public surface never does (status flips and the like).
    pub async fn put_user(&self, user: UserRecord) {
        self.inner
            .write()
            .await
            .users
            .insert(user.user_key.clone(), user);
    }

    /// All session records for one user, for assertions in tests.
    pub async fn sessions_for(&self, user_key: &str) -> Vec<SessionRecord> {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_key == user_key)
            .cloned()
            .collect()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn get_user(&self, user_key: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.read().await.users.get(user_key).cloned())
    }

    async fn user_exists(&self, user_key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.users.contains_key(user_key))
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.user_key) {
            return Err(StoreError::Duplicate);
        }
        inner.users.insert(user.user_key.clone(), user.clone());
        Ok(())
    }

    async fn record_login(&self, user_key: &str, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(user) = self.inner.write().await.users.get_mut(user_key) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn get_two_factor(&self, user_key: &str) -> Result<Option<TwoFactorRecord>, StoreError> {
        Ok(self.inner.read().await.two_factor.get(user_key).cloned())
    }

    async fn enable_two_factor(&self, record: &TwoFactorRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .two_factor
            .insert(record.user_key.clone(), record.clone());
        if let Some(user) = inner.users.get_mut(&record.user_key) {
            user.two_factor_enabled = true;
            user.updated_at = record.created_at;
        }
        Ok(())
    }

    async fn disable_two_factor(&self, user_key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.two_factor.remove(user_key);
        if let Some(user) = inner.users.get_mut(user_key) {
            user.two_factor_enabled = false;
        }
        Ok(())
    }

    async fn touch_two_factor(&self, user_key: &str, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(record) = self.inner.write().await.two_factor.get_mut(user_key) {
            record.last_used = Some(at);
        }
        Ok(())
    }

    async fn create_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.session_key.clone(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    fn user(key: &str) -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            user_key: key.to_string(),
            display_name: "Test User".to_string(),
            email: format!("{key}@example.com"),
            password_hash: "hash".to_string(),
            two_factor_enabled: false,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    #[tokio::test]
    async fn test_user_exists_tracks_creates() {
        let store = MemoryCredentialStore::new();
        assert!(!store.user_exists("k1").await.unwrap());

        store.create_user(&user("k1")).await.unwrap();
        assert!(store.user_exists("k1").await.unwrap());
        assert!(!store.user_exists("k2").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_key() {
        let store = MemoryCredentialStore::new();
        store.create_user(&user("k1")).await.unwrap();

        let result = store.create_user(&user("k1")).await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
    }
}
