/// Melee and explosive tuning.
#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Reach of the melee cone against players.
    pub melee_radius: f32,
    /// Extra reach of the melee cone against beds and blocks.
    pub melee_structure_bonus: f32,
    /// Half of the melee cone's opening angle, in radians.
    pub melee_half_angle: f32,
    pub melee_damage: i32,
    pub melee_knockback: f32,
    pub melee_cooldown_ms: u64,

    pub tnt_fuse_ms: u64,
    pub tnt_radius: f32,
    pub tnt_damage: i32,
    pub tnt_knockback: f32,

    pub place_cooldown_ms: u64,
    /// Maximum distance between a player and the centre of a block it places.
    pub place_range: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            melee_radius: 64.0,
            melee_structure_bonus: 20.0,
            melee_half_angle: 30f32.to_radians(),
            melee_damage: 15,
            melee_knockback: 300.0,
            melee_cooldown_ms: 400,
            tnt_fuse_ms: 3000,
            tnt_radius: 160.0,
            tnt_damage: 120,
            tnt_knockback: 600.0,
            place_cooldown_ms: 150,
            place_range: 180.0,
        }
    }
}
