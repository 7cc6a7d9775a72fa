// Domain-level simulation entities: one record type, one discriminant.

use super::inventory::Inventory;
use super::items::{BlockType, ItemKind, Weapon};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable entity identifier; assigned once by `GameState` and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// One network connection; owns two player characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    pub fn name(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
}

impl Health {
    pub fn full(max_hp: i32) -> Self {
        Self { hp: max_hp, max_hp }
    }

    /// Subtracts damage with the floor at zero; returns the amount actually removed.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        before - self.hp
    }

    pub fn is_depleted(&self) -> bool {
        self.hp <= 0
    }

    pub fn restore(&mut self) {
        self.hp = self.max_hp;
    }
}

/// Respawn sentinel for a character whose team bed is gone.
pub const NO_RESPAWN: i64 = -1;

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub team: Team,
    pub owner: SessionId,
    pub username: String,
    pub health: Health,
    pub is_active: bool,
    pub is_dead: bool,
    /// `> 0` counting down, `NO_RESPAWN` when the bed is gone, `0` when alive.
    pub respawn_time_ms: i64,
    pub last_shot_ms: Option<u64>,
    pub last_melee_ms: Option<u64>,
    pub last_place_ms: Option<u64>,
    pub inventory: Inventory,
    pub selected_slot: usize,
    pub build_mode: bool,
    pub aim: Vec2,
    pub gold: u32,
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: u32,
}

impl PlayerState {
    pub fn new(team: Team, owner: SessionId, username: String, max_hp: i32) -> Self {
        Self {
            team,
            owner,
            username,
            health: Health::full(max_hp),
            is_active: false,
            is_dead: false,
            respawn_time_ms: 0,
            last_shot_ms: None,
            last_melee_ms: None,
            last_place_ms: None,
            inventory: Inventory::starter(),
            selected_slot: 0,
            build_mode: false,
            aim: Vec2::ZERO,
            gold: 0,
            kills: 0,
            deaths: 0,
            damage_dealt: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn selected_item(&self) -> Option<ItemKind> {
        self.inventory.get(self.selected_slot).map(|stack| stack.item)
    }
}

#[derive(Debug, Clone)]
pub struct BulletState {
    pub velocity: Vec2,
    pub owner: EntityId,
    pub weapon: Weapon,
    pub damage: i32,
}

#[derive(Debug, Clone)]
pub struct BlockState {
    pub block_type: BlockType,
    pub health: Health,
    /// Armed TNT detonates once the clock passes this time.
    pub detonate_at_ms: Option<u64>,
    pub placed_by: Option<EntityId>,
}

impl BlockState {
    pub fn new(block_type: BlockType, placed_by: Option<EntityId>) -> Self {
        Self {
            block_type,
            health: Health::full(block_type.max_hp()),
            detonate_at_ms: None,
            placed_by,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BedState {
    pub team: Team,
    pub health: Health,
}

#[derive(Debug, Clone)]
pub struct DropState {
    pub item: ItemKind,
    pub count: u32,
    pub spawned_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorType {
    Gold,
    Supply,
}

/// Where a generator sits; drives its interval, spawn radius and cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationClass {
    Base,
    Center,
}

#[derive(Debug, Clone)]
pub struct GeneratorState {
    pub generator_type: GeneratorType,
    pub location: LocationClass,
    pub last_spawn_ms: u64,
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    Player(PlayerState),
    Bullet(BulletState),
    Block(BlockState),
    Bed(BedState),
    DroppedItem(DropState),
    ResourceGenerator(GeneratorState),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: EntityKind,
}

impl Entity {
    pub fn as_player(&self) -> Option<&PlayerState> {
        match &self.kind {
            EntityKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            EntityKind::Player(player) => Some(player),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_damage_exceeds_hp_then_hp_stops_at_zero() {
        let mut health = Health::full(30);
        assert_eq!(health.apply_damage(50), 30);
        assert_eq!(health.hp, 0);
        assert_eq!(health.apply_damage(10), 0);
        assert!(health.is_depleted());
    }

    #[test]
    fn when_damage_is_negative_then_it_never_heals() {
        let mut health = Health { hp: 10, max_hp: 30 };
        assert_eq!(health.apply_damage(-20), 0);
        assert_eq!(health.hp, 10);
    }
}
