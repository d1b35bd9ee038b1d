// Domain layer: core world model and rules.

pub mod errors;
pub mod state;
pub mod systems;
pub mod tuning;

pub use errors::CommandError;
pub use state::{Extent, MapObject, ObjectId, ObjectKind, Player, Team, WorldState};
