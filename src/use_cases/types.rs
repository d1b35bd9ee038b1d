// Use-case level inputs/outputs for the world task.

use crate::domain::{MapObject, ObjectId, Player, Team, WorldState};
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// A validated client command, already detached from its wire shape.
#[derive(Debug, Clone)]
pub enum Command {
    Move { x: f32, y: f32, z: Option<f32> },
    Collect { id: ObjectId },
    Craft { object: MapObject },
    HitEnemy { id: ObjectId, damage: i32 },
    KillEnemy { id: ObjectId },
    SetTeam { team: Team },
    Chat { text: String },
}

/// What the world should broadcast after a command was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    // State changed; everyone gets a fresh snapshot.
    Updated,
    // Nothing changed; everyone gets this chat line.
    Chat(String),
}

#[derive(Debug)]
pub enum GameEvent {
    Join {
        reply: oneshot::Sender<JoinAck>,
    },
    Leave {
        session_id: String,
    },
    Command {
        session_id: String,
        command: Command,
    },
}

/// Sent back to a connection once its player exists in the world.
#[derive(Debug)]
pub struct JoinAck {
    pub session_id: String,
    // Sequence number of the last world event the snapshot already reflects.
    pub seq: u64,
    pub snapshot: WorldSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub players: BTreeMap<String, Player>,
    pub objects: Vec<MapObject>,
}

impl From<&WorldState> for WorldSnapshot {
    fn from(world: &WorldState) -> Self {
        Self {
            players: world.players().clone(),
            objects: world.objects().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorldEvent {
    // Strictly increasing per world.
    pub seq: u64,
    pub kind: WorldEventKind,
}

#[derive(Debug, Clone)]
pub enum WorldEventKind {
    Update(WorldSnapshot),
    // Delivered to everyone except the player that joined.
    PlayerJoined(Player),
    PlayerLeft { id: String },
    Chat { text: String },
}
