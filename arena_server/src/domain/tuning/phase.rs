/// Match timeline and post-match tuning.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTuning {
    pub building_ms: u64,
    pub combat_ms: u64,
    pub deathmatch_ms: u64,

    /// Players may not stray farther than this from their own bed while building.
    pub building_radius: f32,

    /// Seconds between "everyone ready" and the fresh room.
    pub rematch_countdown_secs: f64,
}

impl Default for PhaseTuning {
    fn default() -> Self {
        Self {
            building_ms: 60_000,
            combat_ms: 480_000,
            deathmatch_ms: 120_000,
            building_radius: 420.0,
            rematch_countdown_secs: 3.0,
        }
    }
}
