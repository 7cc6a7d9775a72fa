// Domain layer: core simulation types and rules.

pub mod agent;
pub mod behaviors;
pub mod entity;
pub mod errors;
pub mod input;
pub mod inventory;
pub mod items;
pub mod loot;
pub mod physics;
pub mod ports;
pub mod rules;
pub mod state;
pub mod trades;
pub mod tuning;

pub use agent::{Agent, Behavior, BehaviorCtx, TickEnv};
pub use entity::{Entity, EntityId, EntityKind, SessionId, Team};
pub use input::{Command, PlayerInput};
pub use physics::{BodyDesc, BodyHandle, BodyKind, Contact, PhysicsWorld, Shape};
pub use state::{GameState, Phase, Winner};
pub use ports::{Clock, UserRecord, UserStore};
pub use tuning::Tuning;
