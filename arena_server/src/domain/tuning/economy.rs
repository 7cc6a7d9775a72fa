/// Drops, pickups and generators.
#[derive(Debug, Clone, Copy)]
pub struct EconomyTuning {
    /// Distance at which a player absorbs a world drop.
    pub pickup_radius: f32,
    /// Same-kind drops closer than this merge into one entity.
    pub merge_radius: f32,
    /// Distance from the player at which dropped items land.
    pub drop_offset: f32,
    /// Age after which an untouched drop is removed.
    pub despawn_ms: u64,
    /// Chance per callback that the despawn pass runs.
    pub cleanup_chance: f64,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            pickup_radius: 28.0,
            merge_radius: 40.0,
            drop_offset: 48.0,
            despawn_ms: 90_000,
            cleanup_chance: 0.05,
        }
    }
}
