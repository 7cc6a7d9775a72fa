// Aggregate root for one match: the entity store plus match-level scalars.

use super::entity::{BedState, Entity, EntityId, EntityKind, SessionId, Team};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

pub const KILL_FEED_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Building,
    Combat,
    Deathmatch,
    Ended,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Building => Phase::Combat,
            Phase::Combat => Phase::Deathmatch,
            Phase::Deathmatch | Phase::Ended => Phase::Ended,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Team(Team),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Kill,
    Environment,
    Bed,
    Phase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub kind: FeedKind,
    pub text: String,
    pub at_ms: u64,
}

/// Most recent events shown to clients; oldest entries fall off first.
#[derive(Debug, Clone, Default)]
pub struct KillFeed {
    entries: VecDeque<FeedEntry>,
}

impl KillFeed {
    pub fn push(&mut self, kind: FeedKind, text: impl Into<String>, at_ms: u64) {
        if self.entries.len() == KILL_FEED_LEN {
            self.entries.pop_front();
        }
        self.entries.push_back(FeedEntry {
            kind,
            text: text.into(),
            at_ms,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamTotals {
    pub kills: u32,
    pub gold: u32,
}

/// Canonical id → entity map, iterated in id order so every pass is deterministic.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityStore {
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn players(&self) -> impl Iterator<Item = (&Entity, &super::entity::PlayerState)> {
        self.entities
            .values()
            .filter_map(|e| e.as_player().map(|p| (e, p)))
    }

    pub fn bed_of(&self, team: Team) -> Option<(&Entity, &BedState)> {
        self.entities.values().find_map(|e| match &e.kind {
            EntityKind::Bed(bed) if bed.team == team => Some((e, bed)),
            _ => None,
        })
    }

    pub fn bed_alive(&self, team: Team) -> bool {
        self.bed_of(team)
            .is_some_and(|(_, bed)| !bed.health.is_depleted())
    }

    /// Living (not dead) characters of a team.
    pub fn living_players(&self, team: Team) -> usize {
        self.players()
            .filter(|(_, p)| p.team == team && p.is_alive())
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub width: f32,
    pub height: f32,
    pub entities: EntityStore,
    pub phase: Phase,
    pub phase_ends_at_ms: u64,
    pub match_started_at_ms: u64,
    pub winner: Option<Winner>,
    pub kill_feed: KillFeed,
    pub frozen: bool,
    pub rematch_ready: BTreeMap<SessionId, bool>,
    /// Seconds left before the rematch room opens; `None` until everyone is ready.
    pub rematch_countdown: Option<f64>,
    pub team_totals: BTreeMap<Team, TeamTotals>,
    next_entity_id: u64,
}

impl GameState {
    pub fn new(width: f32, height: f32, now_ms: u64, building_ms: u64) -> Self {
        Self {
            width,
            height,
            entities: EntityStore::default(),
            phase: Phase::Building,
            phase_ends_at_ms: now_ms + building_ms,
            match_started_at_ms: now_ms,
            winner: None,
            kill_feed: KillFeed::default(),
            frozen: false,
            rematch_ready: BTreeMap::new(),
            rematch_countdown: None,
            team_totals: Team::ALL
                .into_iter()
                .map(|team| (team, TeamTotals::default()))
                .collect(),
            next_entity_id: 1,
        }
    }

    /// Allocates the next entity id. Ids are never reused within a match.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn spawn(&mut self, position: Vec2, kind: EntityKind) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(Entity { id, position, kind });
        id
    }

    pub fn totals_mut(&mut self, team: Team) -> &mut TeamTotals {
        self.team_totals.entry(team).or_default()
    }

    pub fn in_bounds(&self, position: Vec2, margin: f32) -> bool {
        position.x >= -margin
            && position.y >= -margin
            && position.x <= self.width + margin
            && position.y <= self.height + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{DropState, Health};
    use crate::domain::items::ItemKind;

    #[test]
    fn when_kill_feed_overflows_then_oldest_entry_is_evicted() {
        let mut feed = KillFeed::default();
        for i in 0..7 {
            feed.push(FeedKind::Kill, format!("kill {i}"), i);
        }
        let texts: Vec<_> = feed.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["kill 2", "kill 3", "kill 4", "kill 5", "kill 6"]);
    }

    #[test]
    fn when_entities_are_removed_then_ids_are_not_reused() {
        let mut state = GameState::new(100.0, 100.0, 0, 1000);
        let drop = || {
            EntityKind::DroppedItem(DropState {
                item: ItemKind::Arrow,
                count: 1,
                spawned_at_ms: 0,
            })
        };
        let first = state.spawn(Vec2::ZERO, drop());
        state.entities.remove(first);
        let second = state.spawn(Vec2::ZERO, drop());
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn when_bed_hp_is_zero_then_bed_is_not_alive() {
        let mut state = GameState::new(100.0, 100.0, 0, 1000);
        state.spawn(
            Vec2::ZERO,
            EntityKind::Bed(BedState {
                team: Team::Red,
                health: Health { hp: 0, max_hp: 500 },
            }),
        );
        assert!(!state.entities.bed_alive(Team::Red));
        assert!(!state.entities.bed_alive(Team::Blue));
    }
}
