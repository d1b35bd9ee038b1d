// Network adapter modules: per-client sockets and the shared fan-out serializer.

pub mod client;
pub mod fanout;

pub use client::ws_handler;
pub use fanout::{Fanout, spawn_world_serializer};
