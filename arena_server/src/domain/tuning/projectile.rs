use crate::domain::items::Weapon;

/// Flight and damage profile of one weapon's projectile.
#[derive(Debug, Clone, Copy)]
pub struct WeaponProfile {
    /// Initial projectile speed in pixels per second.
    pub speed: f32,

    /// Damage applied on a resolved hit.
    pub damage: i32,

    /// Minimum time between two shots of this weapon.
    pub cooldown_ms: u64,

    /// World-space collision radius in pixels.
    pub radius: f32,
}

/// Gameplay tuning for projectiles.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    pub bow: WeaponProfile,
    pub pearl: WeaponProfile,

    /// Impulse applied to a player hit by an arrow, along the arrow's heading.
    pub knockback: f32,
}

impl ProjectileTuning {
    pub fn profile(&self, weapon: Weapon) -> WeaponProfile {
        match weapon {
            Weapon::Bow => self.bow,
            Weapon::Pearl => self.pearl,
        }
    }
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            bow: WeaponProfile {
                speed: 700.0,
                damage: 50,
                cooldown_ms: 600,
                radius: 4.0,
            },
            pearl: WeaponProfile {
                speed: 520.0,
                damage: 0,
                cooldown_ms: 1000,
                radius: 5.0,
            },
            knockback: 400.0,
        }
    }
}
