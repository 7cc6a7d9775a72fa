// JSON-file user store adapter.

use crate::domain::ports::{UserRecord, UserStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    users: Vec<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct JsonFileUserStore {
    path: PathBuf,
}

impl JsonFileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
    async fn load(&self) -> Result<Vec<UserRecord>, String> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            // A missing file is an empty store.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(format!("read {}: {err}", self.path.display())),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<UsersFile>(&text)
            .map(|file| file.users)
            .map_err(|err| format!("parse {}: {err}", self.path.display()))
    }

    async fn save(&self, users: &[UserRecord]) -> Result<(), String> {
        let file = UsersFile {
            users: users.to_vec(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|err| err.to_string())?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| format!("create {}: {err}", parent.display()))?;
        }
        // Write then rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|err| format!("write {}: {err}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| format!("rename {}: {err}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("arena-users-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn when_file_is_missing_then_store_is_empty() {
        let store = JsonFileUserStore::new(temp_path());
        assert_eq!(store.load().await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn when_users_are_saved_then_they_load_back() {
        let path = temp_path();
        let store = JsonFileUserStore::new(&path);
        let user = UserRecord {
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
            password_hash: "ab".repeat(32),
            salt: "salt".to_string(),
            created_at: 42,
        };

        store.save(std::slice::from_ref(&user)).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, vec![user]);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
