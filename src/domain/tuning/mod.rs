pub mod enemy;
pub mod world;

pub use enemy::EnemyTuning;
pub use world::WorldTuning;
