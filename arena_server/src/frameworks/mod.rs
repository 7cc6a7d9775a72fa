// Frameworks layer: runtime bootstrap, configuration and concrete adapters.

pub mod config;
pub mod physics;
pub mod server;
pub mod users;
