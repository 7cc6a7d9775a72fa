// Network adapter modules split by client sockets vs HTTP routes.

pub mod accounts;
pub mod client;
pub mod internal;

pub use client::{spawn_lobby_serializer, ws_handler};
pub use internal::create_lobby_handler;
