/// Gameplay tuning for player-controlled characters.

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Movement speed in pixels per second.
    pub speed: f32,

    /// World-space collision radius in pixels.
    pub radius: f32,

    /// Health of a freshly spawned character.
    pub max_hp: i32,

    /// Delay before a dead character comes back while its bed stands.
    pub respawn_ms: i64,

    /// Distance from the bed at which the two characters of a session spawn.
    pub spawn_offset: f32,

    /// Minimum time between "inventory full" notifications for one session.
    pub full_inventory_notice_ms: u64,

    /// An idle character starts following its active teammate beyond this distance.
    pub ai_follow_distance: f32,

    /// Axis offsets smaller than this do not produce movement when following.
    pub ai_deadband: f32,

    /// Enemies farther than this are ignored by an idle character.
    pub ai_detection_range: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 220.0,
            radius: 16.0,
            max_hp: 100,
            respawn_ms: 5000,
            spawn_offset: 70.0,
            full_inventory_notice_ms: 2000,
            ai_follow_distance: 120.0,
            ai_deadband: 10.0,
            ai_detection_range: 450.0,
        }
    }
}
