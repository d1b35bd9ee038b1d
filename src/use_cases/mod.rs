// Use cases layer: application workflows for the world server.

pub mod commands;
pub mod types;
pub mod world;

pub use commands::CommandProcessor;
pub use types::{
    Command, CommandOutcome, GameEvent, JoinAck, WorldEvent, WorldEventKind, WorldSnapshot,
};
pub use world::{WorldHandle, WorldSettings, spawn_world};
