// Use-case level inputs/outputs for the game loop.

use crate::domain::entity::{Entity, SessionId, Team};
use crate::domain::input::PlayerInput;
use crate::domain::state::{FeedEntry, Phase, TeamTotals, Winner};
use glam::Vec2;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    Select { index: usize },
    Swap { from_index: usize, to_index: usize },
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join { session_id: SessionId, username: String },
    Leave { session_id: SessionId },
    Input { session_id: SessionId, input: PlayerInput },
    SwitchCharacter { session_id: SessionId },
    Chat { session_id: SessionId, text: String },
    Inventory { session_id: SessionId, action: InventoryAction },
    DropItem { session_id: SessionId, slot_index: usize },
    ShopTrade { session_id: SessionId, trade_id: String },
    ReadyForRematch { session_id: SessionId },
}

/// One seat carried from a finished match into its rematch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub username: String,
    pub team: Team,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerState {
    /// Room exists, nobody has joined yet.
    Waiting,
    Running { phase: Phase },
    Ended { winner: Winner },
    /// Everyone is ready; a fresh room opens when this reaches zero.
    RematchCountdown { seconds_left: u32 },
    /// The room asks its registry for a fresh room seeded with this roster.
    RematchRequested { roster: Arc<Vec<RosterEntry>> },
}

/// Point events pushed to clients next to the replicated state.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Chat {
        from: String,
        text: String,
    },
    Notification {
        /// `None` broadcasts to the whole room.
        target: Option<SessionId>,
        text: String,
        color: String,
    },
    Explosion {
        position: Vec2,
        radius: f32,
    },
    RematchStarting {
        room_id: Arc<str>,
        teams: BTreeMap<Team, Vec<String>>,
    },
}

/// Consistent snapshot of one room after a batch of ticks.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub phase: Phase,
    pub phase_ends_in_ms: u64,
    pub winner: Option<Winner>,
    pub frozen: bool,
    pub kill_feed: Vec<FeedEntry>,
    pub rematch_ready: Vec<SessionId>,
    pub rematch_countdown: Option<f64>,
    pub team_totals: BTreeMap<Team, TeamTotals>,
    pub entities: Vec<Entity>,
}
