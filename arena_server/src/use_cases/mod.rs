// Use cases layer: application workflows for the arena server.

pub mod accounts;
pub mod game;
pub mod lobby;
pub mod simulation;
pub mod types;

pub use accounts::{AccountService, UserProfile};
pub use lobby::{LobbyError, LobbyHandle, LobbyRegistry, LobbySettings};
pub use simulation::{Simulation, SimulationConfig};
pub use types::{GameEvent, InventoryAction, RosterEntry, ServerEvent, ServerState, WorldUpdate};
