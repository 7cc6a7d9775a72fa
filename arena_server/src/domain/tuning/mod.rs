// Gameplay tuning grouped by concern.
//
// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

pub mod combat;
pub mod economy;
pub mod phase;
pub mod player;
pub mod projectile;
pub mod world;

pub use combat::CombatTuning;
pub use economy::EconomyTuning;
pub use phase::PhaseTuning;
pub use player::PlayerTuning;
pub use projectile::ProjectileTuning;
pub use world::WorldTuning;

/// Every tuning table a room needs, passed by reference into the simulation.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub world: WorldTuning,
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
    pub combat: CombatTuning,
    pub phase: PhaseTuning,
    pub economy: EconomyTuning,
}
