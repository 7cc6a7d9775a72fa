use crate::domain::ports::{Clock, UserStore};
use crate::use_cases::{AccountService, LobbyRegistry};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub type Accounts = AccountService<Arc<dyn UserStore>, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    // Active rooms keyed by lobby id.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Room used when a client connects without a lobby id.
    pub default_lobby_id: Arc<str>,
    pub accounts: Arc<Accounts>,
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
