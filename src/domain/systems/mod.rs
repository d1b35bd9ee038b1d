pub mod enemy_ai;
pub mod spawning;
