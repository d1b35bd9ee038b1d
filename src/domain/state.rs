// Domain-level world model: the player roster and the ordered map object sequence.

use std::collections::BTreeMap;

/// Server-assigned identifier that stays attached to a map object for its lifetime.
pub type ObjectId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Anything other than `"Blue"` is treated as a request for the red team.
    pub fn from_request(raw: Option<&str>) -> Self {
        match raw {
            Some("Blue") => Team::Blue,
            _ => Team::Red,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub x: f32,
    pub y: f32,
    // Optional height for clients that render the world in 3D.
    pub z: Option<f32>,
    pub color: String,
    pub team: Option<Team>,
    // Milliseconds since the unix epoch of the last accepted move.
    pub last_update: u64,
}

/// Rectangular footprint used by water and crafted structures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
    pub depth: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Tree { radius: f32 },
    Rock { radius: f32 },
    Water(Extent),
    Wall(Extent),
    Tower(Extent),
    Enemy { radius: f32, health: i32, speed: f32 },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Tree { .. } => "tree",
            ObjectKind::Rock { .. } => "rock",
            ObjectKind::Water(_) => "water",
            ObjectKind::Wall(_) => "wall",
            ObjectKind::Tower(_) => "tower",
            ObjectKind::Enemy { .. } => "enemy",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: ObjectId,
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub color: String,
    pub kind: ObjectKind,
}

impl MapObject {
    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, ObjectKind::Enemy { .. })
    }
}

/// Canonical in-memory world. Holds no game rules; callers validate before mutating.
#[derive(Debug)]
pub struct WorldState {
    players: BTreeMap<String, Player>,
    objects: Vec<MapObject>,
    next_object_id: ObjectId,
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            objects: Vec::new(),
            next_object_id: 1,
        }
    }

    /// Builds a world whose object sequence starts with `objects`, in order.
    pub fn with_objects(objects: impl IntoIterator<Item = MapObject>) -> Self {
        let mut world = Self::new();
        for object in objects {
            world.insert_object(object);
        }
        world
    }

    pub fn players(&self) -> &BTreeMap<String, Player> {
        &self.players
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn contains_player(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        self.players.remove(id)
    }

    /// Appends an object and stamps it with a fresh id, replacing whatever id it carried.
    pub fn insert_object(&mut self, mut object: MapObject) -> ObjectId {
        let id = self.next_object_id;
        self.next_object_id += 1;
        object.id = id;
        self.objects.push(object);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut MapObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Removes the object with `id`, keeping the relative order of the rest.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<MapObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    /// Split borrow for systems that read the roster while moving objects.
    pub fn roster_and_objects_mut(&mut self) -> (&BTreeMap<String, Player>, &mut [MapObject]) {
        (&self.players, &mut self.objects)
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}
