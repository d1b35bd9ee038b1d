/// Gameplay tuning for the map, players and collectible rocks.
///
/// Keep this separate from runtime/server configuration (tick rates, ports, buffer sizes).

#[derive(Debug, Clone)]
pub struct WorldTuning {
    /// Map extent along x.
    pub width: f32,

    /// Map extent along y.
    pub height: f32,

    /// Spawned objects stay this far away from every map edge.
    pub border_margin: f32,

    /// Where new players appear.
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub spawn_z: f32,

    /// Colour of players that have not picked a team.
    pub default_player_color: &'static str,
    pub red_color: &'static str,
    pub blue_color: &'static str,

    pub rock_radius: f32,
    pub rock_z: f32,
    pub rock_color: &'static str,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            border_margin: 100.0,
            spawn_x: 400.0,
            spawn_y: 300.0,
            spawn_z: 10.0,
            default_player_color: "#FF0000",
            red_color: "#FF0000",
            blue_color: "#0000FF",
            rock_radius: 15.0,
            rock_z: 7.5,
            rock_color: "#808080",
        }
    }
}
