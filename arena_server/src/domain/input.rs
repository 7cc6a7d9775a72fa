// Per-tick player intent and the commands behaviors hand to the simulation.

use super::entity::EntityId;
use super::inventory::TakeAmount;
use glam::Vec2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// World-space point the character faces.
    pub aim: Vec2,
    pub shoot: bool,
    pub melee: bool,
    pub build: bool,
    pub drop: bool,
    pub selected_slot: Option<usize>,
}

impl PlayerInput {
    /// Unit movement direction; diagonals are normalized.
    pub fn move_dir(&self) -> Vec2 {
        let x = (self.right as i8 - self.left as i8) as f32;
        let y = (self.down as i8 - self.up as i8) as f32;
        Vec2::new(x, y).normalize_or_zero()
    }
}

/// Where a dropped item lands relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropDirection {
    Aim(Vec2),
    /// Current movement direction, straight down when standing still.
    Movement,
}

/// Cross-entity effects requested by behaviors, drained once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Shoot {
        shooter: EntityId,
        target: Vec2,
    },
    PlaceBlock {
        player: EntityId,
        target: Vec2,
    },
    DropItem {
        player: EntityId,
        slot: usize,
        amount: TakeAmount,
        direction: DropDirection,
    },
    Melee {
        attacker: EntityId,
        facing: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_two_keys_are_held_then_direction_is_normalized() {
        let input = PlayerInput {
            up: true,
            right: true,
            ..Default::default()
        };
        let dir = input.move_dir();
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.x > 0.0 && dir.y < 0.0);
    }

    #[test]
    fn when_opposite_keys_are_held_then_they_cancel() {
        let input = PlayerInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.move_dir(), Vec2::ZERO);
    }
}
