// Lobby orchestration for spawning, replacing and retiring game rooms.

use crate::domain::entity::Team;
use crate::domain::physics::PhysicsWorld;
use crate::use_cases::game::world_task;
use crate::use_cases::simulation::{Simulation, SimulationConfig};
use crate::use_cases::types::RosterEntry;
use crate::use_cases::{GameEvent, ServerEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Capacity for broadcast point events (chat, notifications, explosions).
    pub events_broadcast_capacity: usize,
    /// Fixed wake-up interval for the room loop.
    pub tick_interval: Duration,
    /// How long a finished room lingers after announcing its rematch.
    pub rematch_grace: Duration,
    /// Template for every room's simulation; the roster is filled in per room.
    pub simulation: SimulationConfig,
    /// Fixed seed for every room; a fresh random seed per room when unset.
    pub seed: Option<u64>,
    /// Builds the physics world for a new room.
    pub physics: fn() -> Box<dyn PhysicsWorld>,
    /// Called with every new room, e.g. to start its serializer.
    pub on_created: fn(&LobbyHandle),
}

/// Errors returned by lobby registry operations.
#[derive(Debug)]
pub enum LobbyError {
    /// Lobby already exists and cannot be re-created.
    AlreadyExists,
}

/// Per-lobby channels.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Identifier clients use to target this lobby.
    pub lobby_id: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for high-level server state changes.
    pub server_state_tx: watch::Sender<ServerState>,
    /// Broadcast sender for point events.
    pub events_tx: broadcast::Sender<ServerEvent>,
    /// Stops the world task when the lobby is removed.
    pub shutdown: Arc<Notify>,
    /// Pinned lobbies are replaced in place instead of disappearing.
    pub pinned: bool,
}

/// Thread-safe registry for active lobbies.
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    /// Map of lobby id to active handle.
    lobbies: RwLock<HashMap<String, LobbyHandle>>,
}

impl LobbyRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new lobby, spawns its world task and watches it for rematch requests.
    pub async fn create_lobby(
        self: &Arc<Self>,
        lobby_id: String,
        roster: Vec<RosterEntry>,
        pinned: bool,
    ) -> Result<LobbyHandle, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists);
        }
        let lobby = self.spawn_room(&lobby_id, roster, pinned);
        lobbies.insert(lobby_id, lobby.clone());
        drop(lobbies);

        (self.settings.on_created)(&lobby);
        self.clone().spawn_rematch_watcher(lobby.clone());
        Ok(lobby)
    }

    fn spawn_room(&self, lobby_id: &str, roster: Vec<RosterEntry>, pinned: bool) -> LobbyHandle {
        let settings = &self.settings;
        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::Waiting);
        let (events_tx, _events_rx) =
            broadcast::channel::<ServerEvent>(settings.events_broadcast_capacity);
        let shutdown = Arc::new(Notify::new());

        let seed = settings.seed.unwrap_or_else(rand::random);
        let simulation = Simulation::new(
            SimulationConfig {
                seed,
                roster,
                ..settings.simulation.clone()
            },
            (settings.physics)(),
            0,
        );
        info!(lobby_id, seed, pinned, "lobby created");

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(world_task(
            simulation,
            input_rx,
            world_tx.clone(),
            events_tx.clone(),
            server_state_tx.clone(),
            settings.tick_interval,
            shutdown.clone(),
        ));

        LobbyHandle {
            lobby_id: Arc::from(lobby_id),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            server_state_tx,
            events_tx,
            shutdown,
            pinned,
        }
    }

    /// Returns a lobby handle for the provided id, if it exists.
    pub async fn get_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_id).cloned()
    }

    /// Removes a lobby and stops its world task.
    pub async fn remove_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let removed = self.lobbies.write().await.remove(lobby_id);
        if let Some(lobby) = &removed {
            lobby.shutdown.notify_one();
            info!(lobby_id, "lobby removed");
        }
        removed
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }

    /// Waits for the room to ask for a rematch, then opens the fresh room, redirects
    /// everyone to it and retires the old one after the grace delay. Holds no sender of
    /// the room's state, so it ends once the room is gone.
    pub fn spawn_rematch_watcher(self: Arc<Self>, lobby: LobbyHandle) {
        let mut server_state_rx = lobby.server_state_tx.subscribe();
        let lobby_id = lobby.lobby_id.clone();
        let events_tx = lobby.events_tx.clone();
        let pinned = lobby.pinned;
        drop(lobby);

        tokio::spawn(async move {
            let roster = loop {
                if server_state_rx.changed().await.is_err() {
                    return;
                }
                let state = server_state_rx.borrow_and_update().clone();
                if let ServerState::RematchRequested { roster } = state {
                    break roster;
                }
            };

            let room_id = format!("{lobby_id}-{}", Uuid::new_v4().simple());
            let next = match self
                .create_lobby(room_id, roster.as_ref().clone(), false)
                .await
            {
                Ok(next) => next,
                Err(err) => {
                    warn!(%lobby_id, ?err, "failed to create rematch lobby");
                    return;
                }
            };

            let _ = events_tx.send(ServerEvent::RematchStarting {
                room_id: next.lobby_id.clone(),
                teams: teams_of(&roster),
            });
            info!(%lobby_id, room_id = %next.lobby_id, "rematch starting");

            tokio::time::sleep(self.settings.rematch_grace).await;
            self.retire(&lobby_id, pinned).await;
        });
    }

    /// Removes a finished room; pinned rooms come back empty under the same id.
    async fn retire(self: &Arc<Self>, lobby_id: &str, pinned: bool) {
        self.remove_lobby(lobby_id).await;
        if pinned {
            if let Err(err) = self.create_lobby(lobby_id.to_string(), Vec::new(), true).await {
                warn!(lobby_id, ?err, "failed to reopen pinned lobby");
            }
        }
    }
}

fn teams_of(roster: &[RosterEntry]) -> BTreeMap<Team, Vec<String>> {
    let mut teams: BTreeMap<Team, Vec<String>> = BTreeMap::new();
    for entry in roster {
        teams.entry(entry.team).or_default().push(entry.username.clone());
    }
    teams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::SessionId;
    use crate::domain::tuning::Tuning;
    use crate::frameworks::physics::ArcadePhysics;

    fn physics() -> Box<dyn PhysicsWorld> {
        Box::new(ArcadePhysics::new())
    }

    fn registry() -> Arc<LobbyRegistry> {
        let mut tuning = Tuning::default();
        tuning.world.obstacle_count = 0;
        registry_with(tuning)
    }

    fn registry_with(tuning: Tuning) -> Arc<LobbyRegistry> {
        Arc::new(LobbyRegistry::new(LobbySettings {
            input_channel_capacity: 64,
            world_broadcast_capacity: 16,
            events_broadcast_capacity: 64,
            tick_interval: Duration::from_millis(5),
            rematch_grace: Duration::from_millis(20),
            simulation: SimulationConfig {
                tuning,
                ..SimulationConfig::default()
            },
            seed: Some(1),
            physics,
            on_created: |_| {},
        }))
    }

    #[tokio::test]
    async fn when_lobby_id_is_reused_then_creation_fails() {
        let registry = registry();
        registry
            .create_lobby("room".to_string(), Vec::new(), false)
            .await
            .unwrap();

        let again = registry.create_lobby("room".to_string(), Vec::new(), false).await;

        assert!(matches!(again, Err(LobbyError::AlreadyExists)));
        assert!(registry.get_lobby("room").await.is_some());
    }

    #[tokio::test]
    async fn when_lobby_is_removed_then_it_can_no_longer_be_found() {
        let registry = registry();
        registry
            .create_lobby("room".to_string(), Vec::new(), false)
            .await
            .unwrap();

        assert!(registry.remove_lobby("room").await.is_some());
        assert!(registry.get_lobby("room").await.is_none());
        assert!(registry.remove_lobby("room").await.is_none());
    }

    #[test]
    fn when_roster_is_grouped_then_names_land_under_their_team() {
        let roster = vec![
            RosterEntry {
                username: "alice".to_string(),
                team: Team::Red,
            },
            RosterEntry {
                username: "bob".to_string(),
                team: Team::Blue,
            },
            RosterEntry {
                username: "carol".to_string(),
                team: Team::Red,
            },
        ];

        let teams = teams_of(&roster);

        assert_eq!(teams[&Team::Red], vec!["alice", "carol"]);
        assert_eq!(teams[&Team::Blue], vec!["bob"]);
    }

    #[tokio::test]
    async fn when_everyone_is_ready_after_match_then_players_are_redirected() {
        let mut tuning = Tuning::default();
        tuning.world.obstacle_count = 0;
        tuning.phase.building_ms = 10;
        tuning.phase.combat_ms = 10;
        tuning.phase.deathmatch_ms = 10;
        tuning.phase.rematch_countdown_secs = 0.05;
        let registry = registry_with(tuning);
        let lobby = registry
            .create_lobby("room".to_string(), Vec::new(), false)
            .await
            .unwrap();
        let mut events = lobby.events_tx.subscribe();
        let mut state = lobby.server_state_tx.subscribe();

        lobby
            .input_tx
            .send(GameEvent::Join {
                session_id: SessionId(1),
                username: "alice".to_string(),
            })
            .await
            .unwrap();
        tokio::time::timeout(
            Duration::from_secs(2),
            state.wait_for(|s| matches!(s, ServerState::Ended { .. })),
        )
        .await
        .expect("match should end")
        .unwrap();

        lobby
            .input_tx
            .send(GameEvent::ReadyForRematch {
                session_id: SessionId(1),
            })
            .await
            .unwrap();

        let (room_id, teams) = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(ServerEvent::RematchStarting { room_id, teams }) => break (room_id, teams),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("events closed"),
                }
            }
        })
        .await
        .expect("rematch should start");

        assert_eq!(teams[&Team::Red], vec!["alice"]);
        assert!(room_id.starts_with("room-"));
        assert!(registry.get_lobby(&room_id).await.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.get_lobby("room").await.is_none());
        assert!(registry.get_lobby(&room_id).await.is_some());
    }
}
