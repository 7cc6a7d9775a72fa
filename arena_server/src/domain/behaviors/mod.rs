// Concrete per-entity behaviors run by agents every tick.

mod ai_control;
mod player_control;
mod sync_transform;

pub use ai_control::AiControl;
pub use player_control::PlayerControl;
pub use sync_transform::SyncTransform;
