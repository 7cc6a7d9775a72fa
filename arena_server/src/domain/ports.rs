use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Registered account as persisted by the user store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: u64,
}

// Port for account persistence used by the account use cases.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self) -> Result<Vec<UserRecord>, String>;
    async fn save(&self, users: &[UserRecord]) -> Result<(), String>;
}

#[async_trait]
impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    async fn load(&self) -> Result<Vec<UserRecord>, String> {
        (**self).load().await
    }

    async fn save(&self, users: &[UserRecord]) -> Result<(), String> {
        (**self).save(users).await
    }
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}
