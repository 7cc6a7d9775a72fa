// Authoritative simulation of one room: the single owner of its GameState, physics world,
// agents and sessions. The world task feeds it events and wall-clock time; it never awaits.

mod combat;
mod economy;
mod map;
mod phase;
mod rematch;
mod resources;
mod sessions;


pub use economy::{DropError, PlaceError};
pub use rematch::RematchError;

use crate::domain::agent::{Agent, TickEnv};
use crate::domain::entity::{EntityId, PlayerState, SessionId, Team};
use crate::domain::input::Command;
use crate::domain::physics::{BodyHandle, PhysicsWorld};
use crate::domain::state::{GameState, Phase};
use crate::domain::tuning::Tuning;
use crate::use_cases::types::{RosterEntry, ServerEvent, ServerState, WorldUpdate};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed simulation step (60 Hz).
pub const STEP_MS: f64 = 1000.0 / 60.0;
/// Ticks run per `advance` before the remaining backlog is dropped.
pub const MAX_TICKS_PER_ADVANCE: u32 = 8;

/// Where dead characters' bodies are parked.
pub(crate) const DEAD_BODY_POSITION: Vec2 = Vec2::new(-10_000.0, -10_000.0);

pub(crate) const COLOR_INFO: &str = "#ffffff";
pub(crate) const COLOR_SUCCESS: &str = "#55ff55";
pub(crate) const COLOR_ERROR: &str = "#ff5555";
pub(crate) const COLOR_GOLD: &str = "#ffd700";

#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub tuning: Tuning,
    pub seed: u64,
    pub cheats_enabled: bool,
    /// Teams carried over from the previous match, matched by username.
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub username: String,
    pub team: Team,
    pub characters: [EntityId; 2],
    pub last_full_notice_ms: Option<u64>,
}

pub struct Simulation {
    state: GameState,
    physics: Box<dyn PhysicsWorld>,
    agents: BTreeMap<EntityId, Agent>,
    sessions: BTreeMap<SessionId, Session>,
    roster: Vec<RosterEntry>,
    commands: Vec<Command>,
    events: Vec<ServerEvent>,
    rng: ChaCha8Rng,
    tuning: Tuning,
    cheats_enabled: bool,
    clock_ms: f64,
    last_advance_ms: Option<u64>,
    accumulator_ms: f64,
    tick: u64,
    rematch_requested: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, physics: Box<dyn PhysicsWorld>, now_ms: u64) -> Self {
        let tuning = config.tuning;
        let state = GameState::new(
            tuning.world.width,
            tuning.world.height,
            now_ms,
            tuning.phase.building_ms,
        );
        let mut sim = Self {
            state,
            physics,
            agents: BTreeMap::new(),
            sessions: BTreeMap::new(),
            roster: config.roster,
            commands: Vec::new(),
            events: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tuning,
            cheats_enabled: config.cheats_enabled,
            clock_ms: now_ms as f64,
            last_advance_ms: None,
            accumulator_ms: 0.0,
            tick: 0,
            rematch_requested: false,
        };
        sim.build_map();
        sim
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in milliseconds; advances by whole fixed steps.
    pub fn now_ms(&self) -> u64 {
        self.clock_ms as u64
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn characters_of(&self, session_id: SessionId) -> Option<[EntityId; 2]> {
        self.sessions.get(&session_id).map(|s| s.characters)
    }

    pub fn take_events(&mut self) -> Vec<ServerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs as many fixed steps as the wall-clock time since the last call allows, then the
    /// once-per-call background passes. Returns the number of steps run.
    pub fn advance(&mut self, now_ms: u64) -> u32 {
        let last = self.last_advance_ms.replace(now_ms).unwrap_or(now_ms);
        self.accumulator_ms += now_ms.saturating_sub(last) as f64;

        let mut ticks = 0;
        while self.accumulator_ms >= STEP_MS && ticks < MAX_TICKS_PER_ADVANCE {
            self.accumulator_ms -= STEP_MS;
            self.step();
            ticks += 1;
        }

        if self.accumulator_ms >= STEP_MS {
            let dropped = (self.accumulator_ms / STEP_MS).floor();
            warn!(
                dropped_ticks = dropped as u64,
                "simulation fell behind; dropping backlog"
            );
            self.accumulator_ms -= dropped * STEP_MS;
            self.clock_ms += dropped * STEP_MS;
        }

        if !self.state.frozen {
            self.run_background_passes();
        }
        ticks
    }

    /// One fixed step.
    pub(crate) fn step(&mut self) {
        let before = self.now_ms();
        self.clock_ms += STEP_MS;
        self.tick += 1;
        let now = self.now_ms();
        let dt_ms = now - before;
        let dt = (STEP_MS / 1000.0) as f32;

        self.update_phase(now);

        let frozen = self.state.frozen;
        if !frozen {
            self.tick_respawns(dt_ms);
            self.update_agents(now, dt);
            self.drain_commands();
            self.physics.step(dt);
            if self.state.phase == Phase::Building {
                self.clamp_to_base();
            }
        }
        self.post_update_agents(now, dt);
        if !frozen {
            self.enforce_bounds();
            self.resolve_contacts();
        }
        self.tick_rematch(STEP_MS / 1000.0);
    }

    pub(crate) fn run_background_passes(&mut self) {
        self.collect_pickups();
        self.tick_generators();
        self.check_fuses();
        self.maybe_cleanup_drops();
    }

    fn update_agents(&mut self, now_ms: u64, dt: f32) {
        let Self {
            state,
            physics,
            agents,
            commands,
            tuning,
            ..
        } = self;
        let mut env = TickEnv {
            entities: &mut state.entities,
            physics: &mut **physics,
            commands,
            tuning,
            now_ms,
            dt,
        };
        for agent in agents.values_mut() {
            agent.update(&mut env);
        }
    }

    fn post_update_agents(&mut self, now_ms: u64, dt: f32) {
        let Self {
            state,
            physics,
            agents,
            commands,
            tuning,
            ..
        } = self;
        let mut env = TickEnv {
            entities: &mut state.entities,
            physics: &mut **physics,
            commands,
            tuning,
            now_ms,
            dt,
        };
        for agent in agents.values_mut() {
            agent.post_update(&mut env);
        }
    }

    fn drain_commands(&mut self) {
        for command in std::mem::take(&mut self.commands) {
            match command {
                Command::Shoot { shooter, target } => self.shoot(shooter, target),
                Command::PlaceBlock { player, target } => {
                    if let Err(err) = self.place_block(player, target) {
                        debug!(entity_id = player.0, ?err, "block placement rejected");
                    }
                }
                Command::DropItem {
                    player,
                    slot,
                    amount,
                    direction,
                } => {
                    if let Err(err) = self.drop_from_slot(player, slot, amount, direction) {
                        debug!(entity_id = player.0, ?err, "drop rejected");
                    }
                }
                Command::Melee { attacker, facing } => self.melee(attacker, facing),
            }
        }
    }

    pub fn server_state(&self) -> ServerState {
        if self.rematch_requested {
            return ServerState::RematchRequested {
                roster: Arc::new(self.roster_snapshot()),
            };
        }
        if let Some(seconds) = self.state.rematch_countdown {
            return ServerState::RematchCountdown {
                seconds_left: seconds.ceil().max(0.0) as u32,
            };
        }
        if let Some(winner) = self.state.winner {
            return ServerState::Ended { winner };
        }
        if self.sessions.is_empty() {
            return ServerState::Waiting;
        }
        ServerState::Running {
            phase: self.state.phase,
        }
    }

    pub fn snapshot(&self) -> WorldUpdate {
        let now = self.now_ms();
        WorldUpdate {
            tick: self.tick,
            width: self.state.width,
            height: self.state.height,
            phase: self.state.phase,
            phase_ends_in_ms: self.state.phase_ends_at_ms.saturating_sub(now),
            winner: self.state.winner,
            frozen: self.state.frozen,
            kill_feed: self.state.kill_feed.entries().cloned().collect(),
            rematch_ready: self
                .state
                .rematch_ready
                .iter()
                .filter(|(_, ready)| **ready)
                .map(|(session, _)| *session)
                .collect(),
            rematch_countdown: self.state.rematch_countdown,
            team_totals: self.state.team_totals.clone(),
            entities: self.state.entities.iter().cloned().collect(),
        }
    }

    pub(crate) fn player(&self, id: EntityId) -> Option<&PlayerState> {
        self.state.entities.get(id)?.as_player()
    }

    pub(crate) fn player_mut(&mut self, id: EntityId) -> Option<&mut PlayerState> {
        self.state.entities.get_mut(id)?.as_player_mut()
    }

    pub(crate) fn body(&self, id: EntityId) -> Option<BodyHandle> {
        self.physics.body_of(id)
    }

    pub(crate) fn position(&self, id: EntityId) -> Option<Vec2> {
        self.state.entities.get(id).map(|e| e.position)
    }

    /// Moves an entity and its body together.
    pub(crate) fn teleport(&mut self, id: EntityId, position: Vec2) {
        if let Some(body) = self.body(id) {
            self.physics.set_position(body, position);
            self.physics.set_velocity(body, Vec2::ZERO);
        }
        if let Some(entity) = self.state.entities.get_mut(id) {
            entity.position = position;
        }
    }

    /// Removes an entity together with its agent and body.
    pub(crate) fn despawn(&mut self, id: EntityId) {
        if let Some(body) = self.body(id) {
            self.physics.remove_body(body);
        }
        self.agents.remove(&id);
        self.state.entities.remove(id);
    }

    pub(crate) fn notify(&mut self, target: Option<SessionId>, text: impl Into<String>, color: &str) {
        self.events.push(ServerEvent::Notification {
            target,
            text: text.into(),
            color: color.to_string(),
        });
    }

    /// The session's controlled character, if any.
    pub(crate) fn active_character(&self, session_id: SessionId) -> Option<EntityId> {
        let session = self.sessions.get(&session_id)?;
        session
            .characters
            .into_iter()
            .find(|id| self.player(*id).is_some_and(|p| p.is_active))
    }
}
