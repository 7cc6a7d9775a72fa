// Game phase controller: the timed state machine, respawn timers, the building-phase
// leash, bounds enforcement and win detection.

use super::map::bed_position;
use super::{COLOR_GOLD, Simulation};
use crate::domain::entity::{EntityId, EntityKind, Team};
use crate::domain::rules::{
    TeamStanding, clamp_to_radius, elimination_winner, phase_end_ms, phase_for_elapsed,
    timeout_winner,
};
use crate::domain::state::{FeedKind, Phase, Winner};
use glam::Vec2;
use tracing::info;

impl Simulation {
    /// Steps the phase forward one state at a time until it matches elapsed time, then
    /// checks the elimination rule.
    pub(crate) fn update_phase(&mut self, now_ms: u64) {
        if self.state.phase == Phase::Ended {
            return;
        }
        // An empty room holds the match clock at the start of building.
        if self.sessions.is_empty() && self.state.phase == Phase::Building {
            self.state.match_started_at_ms = now_ms;
        }
        let elapsed = now_ms.saturating_sub(self.state.match_started_at_ms);
        let target = phase_for_elapsed(elapsed, &self.tuning.phase);
        while self.state.phase < target {
            let next = self.state.phase.next();
            self.enter_phase(next, now_ms);
            if self.state.phase == Phase::Ended {
                return;
            }
        }
        self.state.phase_ends_at_ms =
            phase_end_ms(self.state.phase, self.state.match_started_at_ms, &self.tuning.phase);

        if self.state.phase >= Phase::Combat {
            if let Some(winner) = elimination_winner(&self.standings()) {
                self.end_match(winner, now_ms);
            }
        }
    }

    fn enter_phase(&mut self, phase: Phase, now_ms: u64) {
        info!(?phase, "phase changed");
        match phase {
            Phase::Building => {}
            Phase::Combat => {
                self.state.phase = phase;
                self.announce("Combat has begun", now_ms);
            }
            Phase::Deathmatch => {
                self.state.phase = phase;
                let beds: Vec<(EntityId, Team)> = self
                    .state
                    .entities
                    .iter()
                    .filter_map(|e| match &e.kind {
                        EntityKind::Bed(bed) => Some((e.id, bed.team)),
                        _ => None,
                    })
                    .collect();
                for (id, team) in beds {
                    self.destroy_bed(id, team);
                }
                self.announce("Deathmatch! All beds destroyed", now_ms);
            }
            Phase::Ended => {
                let winner = timeout_winner(&self.standings());
                self.end_match(winner, now_ms);
            }
        }
    }

    fn announce(&mut self, text: &str, now_ms: u64) {
        self.state.kill_feed.push(FeedKind::Phase, text, now_ms);
        self.notify(None, text, COLOR_GOLD);
    }

    pub(crate) fn standings(&self) -> [TeamStanding; 2] {
        Team::ALL.map(|team| TeamStanding {
            team,
            bed_hp: self
                .state
                .entities
                .bed_of(team)
                .map(|(_, bed)| bed.health.hp)
                .unwrap_or(0),
            living: self.state.entities.living_players(team),
        })
    }

    pub(crate) fn end_match(&mut self, winner: Winner, now_ms: u64) {
        if self.state.phase == Phase::Ended && self.state.winner.is_some() {
            return;
        }
        self.state.phase = Phase::Ended;
        self.state.winner = Some(winner);
        self.state.frozen = true;
        self.state.phase_ends_at_ms = now_ms;
        for agent in self.agents.values_mut() {
            agent.inputs.clear();
        }

        let text = match winner {
            Winner::Team(team) => format!("{} team wins!", team.name()),
            Winner::Draw => "Draw!".to_string(),
        };
        info!(?winner, "match ended");
        self.announce(&text, now_ms);
    }

    pub(crate) fn tick_respawns(&mut self, dt_ms: u64) {
        let due: Vec<EntityId> = self
            .state
            .entities
            .iter_mut()
            .filter_map(|e| {
                let id = e.id;
                let player = e.as_player_mut()?;
                if !player.is_dead || player.respawn_time_ms <= 0 {
                    return None;
                }
                player.respawn_time_ms -= dt_ms as i64;
                (player.respawn_time_ms <= 0).then_some(id)
            })
            .collect();

        for id in due {
            self.respawn(id);
        }
    }

    fn respawn(&mut self, id: EntityId) {
        let Some(player) = self.player(id) else {
            return;
        };
        let owner = player.owner;
        let team = player.team;
        let Some(index) = self
            .sessions
            .get(&owner)
            .and_then(|s| s.characters.iter().position(|c| *c == id))
        else {
            return;
        };
        let session_has_active = self.active_character(owner).is_some();

        if let Some(player) = self.player_mut(id) {
            player.is_dead = false;
            player.respawn_time_ms = 0;
            player.health.restore();
            player.is_active = !session_has_active;
        }
        let spawn = self.spawn_point(team, index);
        self.teleport(id, spawn);
        info!(entity_id = id.0, "player respawned");
    }

    /// Keeps characters within reach of their own bed while building.
    pub(crate) fn clamp_to_base(&mut self) {
        let radius = self.tuning.phase.building_radius;
        let players: Vec<(EntityId, Team)> = self
            .state
            .entities
            .players()
            .filter(|(_, p)| p.is_alive())
            .map(|(e, p)| (e.id, p.team))
            .collect();

        for (id, team) in players {
            let Some(body) = self.body(id) else { continue };
            let Some(position) = self.physics.position(body) else {
                continue;
            };
            if let Some(clamped) = clamp_to_radius(bed_position(team), position, radius) {
                self.physics.set_position(body, clamped);
                self.physics.set_velocity(body, Vec2::ZERO);
            }
        }
    }

    /// Kills living characters that left the map and removes stray projectiles.
    pub(crate) fn enforce_bounds(&mut self) {
        let margin = self.tuning.world.out_of_bounds_margin;
        let mut fallen = Vec::new();
        let mut strays = Vec::new();
        for entity in self.state.entities.iter() {
            if self.state.in_bounds(entity.position, margin) {
                continue;
            }
            match &entity.kind {
                EntityKind::Player(p) if p.is_alive() => fallen.push(entity.id),
                EntityKind::Bullet(_) => strays.push(entity.id),
                _ => {}
            }
        }
        for id in fallen {
            self.kill_player(id, None, FeedKind::Environment);
        }
        for id in strays {
            self.despawn(id);
        }
    }
}
