/// Gameplay tuning for spawned enemies.

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    /// Hit points of a freshly spawned enemy.
    pub health: i32,

    /// Distance covered per AI tick.
    pub speed: f32,

    pub radius: f32,
    pub z: f32,
    pub color: &'static str,

    /// Probability that a killed enemy leaves a rock behind.
    pub rock_drop_chance: f64,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            health: 3,
            speed: 2.0,
            radius: 12.0,
            z: 6.0,
            color: "#FF0000",
            rock_drop_chance: 0.5,
        }
    }
}
