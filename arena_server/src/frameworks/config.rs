use crate::domain::tuning::Tuning;
use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn users_file() -> PathBuf {
    env::var("USERS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/users.json"))
}

pub fn cheats_enabled() -> bool {
    matches!(
        env::var("ARENA_CHEATS").as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Fixed seed for every room; rooms draw a random seed when unset.
pub fn world_seed() -> Option<u64> {
    env::var("WORLD_SEED").ok().and_then(|v| v.parse().ok())
}

fn secs_from_env(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

/// Default tuning with the match timeline overridden from the environment.
pub fn tuning() -> Tuning {
    let mut tuning = Tuning::default();
    if let Some(ms) = secs_from_env("MATCH_BUILDING_SECS") {
        tuning.phase.building_ms = ms;
    }
    if let Some(ms) = secs_from_env("MATCH_COMBAT_SECS") {
        tuning.phase.combat_ms = ms;
    }
    if let Some(ms) = secs_from_env("MATCH_DEATHMATCH_SECS") {
        tuning.phase.deathmatch_ms = ms;
    }
    tuning
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const EVENTS_BROADCAST_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Old room lingers this long after a rematch so clients can follow the redirect.
pub const REMATCH_GRACE: Duration = Duration::from_millis(500);

pub const DEFAULT_LOBBY_ID: &str = "test";
