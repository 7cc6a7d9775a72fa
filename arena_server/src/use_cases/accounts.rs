// Account registration and login against the user store port.

use crate::domain::errors::UserStoreError;
use crate::domain::ports::{Clock, UserRecord, UserStore};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 20;
const PASSWORD_MIN_LEN: usize = 6;

/// Account data safe to hand out (no hash or salt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub created_at: u64,
}

impl From<&UserRecord> for UserProfile {
    fn from(record: &UserRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            username: record.username.clone(),
            created_at: record.created_at,
        }
    }
}

// Account use cases with injected dependencies.
pub struct AccountService<S, C> {
    store: S,
    clock: C,
    // Serializes read-modify-write cycles on the store.
    write_lock: Mutex<()>,
}

impl<S, C> AccountService<S, C>
where
    S: UserStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile, UserStoreError> {
        let username = validate_username(username)?;
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(UserStoreError::InvalidPassword);
        }

        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&username))
        {
            return Err(UserStoreError::UsernameTaken);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let record = UserRecord {
            user_id: Uuid::new_v4().to_string(),
            password_hash: hash_password(&salt, password),
            salt,
            username,
            created_at: self.clock.now_epoch_seconds(),
        };
        let profile = UserProfile::from(&record);
        users.push(record);
        self.store.save(&users).await.map_err(|err| {
            warn!(error = %err, "failed to save users");
            UserStoreError::StorageFailure
        })?;

        info!(user_id = %profile.user_id, username = %profile.username, "user registered");
        Ok(profile)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, UserStoreError> {
        let users = self.load().await?;
        let record = users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username.trim()))
            .ok_or(UserStoreError::InvalidCredentials)?;
        if hash_password(&record.salt, password) != record.password_hash {
            return Err(UserStoreError::InvalidCredentials);
        }
        Ok(UserProfile::from(record))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile, UserStoreError> {
        let users = self.load().await?;
        users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(UserProfile::from)
            .ok_or(UserStoreError::NotFound)
    }

    pub async fn all_users(&self) -> Result<Vec<UserProfile>, UserStoreError> {
        let users = self.load().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    async fn load(&self) -> Result<Vec<UserRecord>, UserStoreError> {
        self.store.load().await.map_err(|err| {
            warn!(error = %err, "failed to load users");
            UserStoreError::StorageFailure
        })
    }
}

fn validate_username(value: &str) -> Result<String, UserStoreError> {
    let value = value.trim();
    let len = value.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(UserStoreError::InvalidUsername);
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UserStoreError::InvalidUsername);
    }
    Ok(value.to_string())
}

/// Hex SHA-256 of salt followed by password.
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_epoch_seconds(&self) -> u64 {
            self.0
        }
    }

    #[derive(Clone, Default)]
    struct RecordingStore {
        users: Arc<StdMutex<Vec<UserRecord>>>,
        // Toggle used by negative-path tests to simulate infrastructure failure.
        should_fail_save: bool,
    }

    #[async_trait]
    impl UserStore for RecordingStore {
        async fn load(&self) -> Result<Vec<UserRecord>, String> {
            Ok(self.users.lock().expect("users mutex poisoned").clone())
        }

        async fn save(&self, users: &[UserRecord]) -> Result<(), String> {
            if self.should_fail_save {
                return Err("save failed".to_string());
            }
            *self.users.lock().expect("users mutex poisoned") = users.to_vec();
            Ok(())
        }
    }

    fn service(store: RecordingStore) -> AccountService<RecordingStore, FixedClock> {
        AccountService::new(store, FixedClock(1_700_000_000))
    }

    #[tokio::test]
    async fn when_registering_new_user_then_salted_hash_is_stored() {
        let store = RecordingStore::default();
        let accounts = service(store.clone());

        let profile = accounts
            .register("alice_1", "hunter22")
            .await
            .expect("expected registration to succeed");

        assert_eq!(profile.username, "alice_1");
        assert_eq!(profile.created_at, 1_700_000_000);
        let users = store.users.lock().expect("users mutex poisoned");
        assert_eq!(users.len(), 1);
        assert_ne!(users[0].password_hash, "hunter22");
        assert_eq!(users[0].password_hash.len(), 64);
        assert_eq!(users[0].password_hash, hash_password(&users[0].salt, "hunter22"));
    }

    #[tokio::test]
    async fn when_username_is_taken_ignoring_case_then_registration_fails() {
        let accounts = service(RecordingStore::default());
        accounts.register("alice", "hunter22").await.unwrap();

        let result = accounts.register("ALICE", "other-pass").await;

        assert_eq!(result, Err(UserStoreError::UsernameTaken));
    }

    #[tokio::test]
    async fn when_username_has_symbols_then_registration_fails() {
        let accounts = service(RecordingStore::default());

        assert_eq!(
            accounts.register("al!ce", "hunter22").await,
            Err(UserStoreError::InvalidUsername)
        );
        assert_eq!(
            accounts.register("al", "hunter22").await,
            Err(UserStoreError::InvalidUsername)
        );
        assert_eq!(
            accounts.register("alice", "short").await,
            Err(UserStoreError::InvalidPassword)
        );
    }

    #[tokio::test]
    async fn when_password_matches_then_login_returns_profile() {
        let accounts = service(RecordingStore::default());
        let registered = accounts.register("alice", "hunter22").await.unwrap();

        let profile = accounts.login("alice", "hunter22").await.unwrap();

        assert_eq!(profile, registered);
        assert_eq!(
            accounts.login("alice", "wrong-pass").await,
            Err(UserStoreError::InvalidCredentials)
        );
        assert_eq!(
            accounts.login("nobody", "hunter22").await,
            Err(UserStoreError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn when_store_save_fails_then_returns_storage_failure() {
        let accounts = service(RecordingStore {
            should_fail_save: true,
            ..RecordingStore::default()
        });

        let result = accounts.register("alice", "hunter22").await;

        assert_eq!(result, Err(UserStoreError::StorageFailure));
    }

    #[tokio::test]
    async fn when_looking_up_users_then_profiles_are_returned() {
        let accounts = service(RecordingStore::default());
        let alice = accounts.register("alice", "hunter22").await.unwrap();
        accounts.register("bob", "hunter22").await.unwrap();

        assert_eq!(accounts.get_user(&alice.user_id).await, Ok(alice));
        assert_eq!(
            accounts.get_user("missing").await,
            Err(UserStoreError::NotFound)
        );
        assert_eq!(accounts.all_users().await.unwrap().len(), 2);
    }
}
