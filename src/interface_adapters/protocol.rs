// Wire protocol DTOs and conversions for the world server's WebSocket messages.
// Every message is one JSON object discriminated by its `type` field.

use crate::domain::{Extent, MapObject, ObjectId, ObjectKind, Player, Team};
use crate::use_cases::{Command, WorldSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    // Sent once to a new session: its own id plus the full world.
    Init {
        id: String,
        players: BTreeMap<String, PlayerDto>,
        #[serde(rename = "mapObjects")]
        map_objects: Vec<MapObjectDto>,
    },
    PlayerJoined {
        player: PlayerDto,
    },
    PlayerLeft {
        id: String,
    },
    // Full snapshot; there are no deltas.
    Update {
        players: BTreeMap<String, PlayerDto>,
        #[serde(rename = "mapObjects")]
        map_objects: Vec<MapObjectDto>,
    },
    Chat {
        text: String,
    },
}

impl ServerMessage {
    pub fn init(id: String, snapshot: &WorldSnapshot) -> Self {
        let (players, map_objects) = snapshot_dtos(snapshot);
        ServerMessage::Init {
            id,
            players,
            map_objects,
        }
    }

    pub fn update(snapshot: &WorldSnapshot) -> Self {
        let (players, map_objects) = snapshot_dtos(snapshot);
        ServerMessage::Update {
            players,
            map_objects,
        }
    }
}

fn snapshot_dtos(snapshot: &WorldSnapshot) -> (BTreeMap<String, PlayerDto>, Vec<MapObjectDto>) {
    let players = snapshot
        .players
        .iter()
        .map(|(id, p)| (id.clone(), PlayerDto::from(p)))
        .collect();
    let objects = snapshot.objects.iter().map(MapObjectDto::from).collect();
    (players, objects)
}

/// Messages clients send to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Move {
        x: f32,
        y: f32,
        #[serde(default)]
        z: Option<f32>,
    },
    Collect {
        id: ObjectId,
    },
    Craft {
        object: MapObjectDto,
    },
    HitEnemy {
        id: ObjectId,
        damage: f64,
    },
    // Sent by the browser client when it touches an enemy.
    KillEnemy {
        id: ObjectId,
    },
    SetTeam {
        // Any value other than "Blue" selects red.
        #[serde(default)]
        team: serde_json::Value,
    },
    Chat {
        text: String,
    },
    // Well-formed message with a type this server does not handle.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Converts to a world command; `None` for messages that carry no command.
    pub fn into_command(self) -> Option<Command> {
        let command = match self {
            ClientMessage::Move { x, y, z } => Command::Move { x, y, z },
            ClientMessage::Collect { id } => Command::Collect { id },
            ClientMessage::Craft { object } => Command::Craft {
                object: object.into(),
            },
            ClientMessage::HitEnemy { id, damage } => Command::HitEnemy {
                id,
                // Health is integral; fractional damage rounds to the nearest point.
                damage: damage.round() as i32,
            },
            ClientMessage::KillEnemy { id } => Command::KillEnemy { id },
            ClientMessage::SetTeam { team } => Command::SetTeam {
                team: Team::from_request(team.as_str()),
            },
            ClientMessage::Chat { text } => Command::Chat { text },
            ClientMessage::Unknown => return None,
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamDto {
    Red,
    Blue,
}

impl From<Team> for TeamDto {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => TeamDto::Red,
            Team::Blue => TeamDto::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    pub color: String,
    pub team: Option<TeamDto>,
    pub last_update: u64,
}

impl From<&Player> for PlayerDto {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            x: p.x,
            y: p.y,
            z: p.z,
            color: p.color.clone(),
            team: p.team.map(TeamDto::from),
            last_update: p.last_update,
        }
    }
}

/// A map object on the wire: common fields plus the kind-specific shape, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObjectDto {
    // Assigned by the server; ignored when a client crafts an object.
    #[serde(default)]
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: ObjectKindDto,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectKindDto {
    Tree {
        radius: f32,
    },
    Rock {
        radius: f32,
    },
    Water(ExtentDto),
    Wall(ExtentDto),
    Tower(ExtentDto),
    Enemy {
        radius: f32,
        health: i32,
        speed: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentDto {
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
}

impl From<Extent> for ExtentDto {
    fn from(e: Extent) -> Self {
        Self {
            width: e.width,
            height: e.height,
            depth: e.depth,
        }
    }
}

impl From<ExtentDto> for Extent {
    fn from(e: ExtentDto) -> Self {
        Self {
            width: e.width,
            height: e.height,
            depth: e.depth,
        }
    }
}

impl From<&MapObject> for MapObjectDto {
    fn from(o: &MapObject) -> Self {
        let kind = match &o.kind {
            ObjectKind::Tree { radius } => ObjectKindDto::Tree { radius: *radius },
            ObjectKind::Rock { radius } => ObjectKindDto::Rock { radius: *radius },
            ObjectKind::Water(e) => ObjectKindDto::Water((*e).into()),
            ObjectKind::Wall(e) => ObjectKindDto::Wall((*e).into()),
            ObjectKind::Tower(e) => ObjectKindDto::Tower((*e).into()),
            ObjectKind::Enemy {
                radius,
                health,
                speed,
            } => ObjectKindDto::Enemy {
                radius: *radius,
                health: *health,
                speed: *speed,
            },
        };
        Self {
            id: o.id,
            kind,
            x: o.x,
            y: o.y,
            z: o.z,
            color: o.color.clone(),
        }
    }
}

impl From<MapObjectDto> for MapObject {
    fn from(o: MapObjectDto) -> Self {
        let kind = match o.kind {
            ObjectKindDto::Tree { radius } => ObjectKind::Tree { radius },
            ObjectKindDto::Rock { radius } => ObjectKind::Rock { radius },
            ObjectKindDto::Water(e) => ObjectKind::Water(e.into()),
            ObjectKindDto::Wall(e) => ObjectKind::Wall(e.into()),
            ObjectKindDto::Tower(e) => ObjectKind::Tower(e.into()),
            ObjectKindDto::Enemy {
                radius,
                health,
                speed,
            } => ObjectKind::Enemy {
                radius,
                health,
                speed,
            },
        };
        Self {
            id: o.id,
            x: o.x,
            y: o.y,
            z: o.z,
            color: o.color,
            kind,
        }
    }
}
