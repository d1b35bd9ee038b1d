// Object factories for the starting world, timed spawns and enemy drops.

use crate::domain::state::{Extent, MapObject, ObjectKind};
use crate::domain::tuning::{EnemyTuning, WorldTuning};
use rand::Rng;

/// The three decorations every fresh world starts with.
pub fn starting_objects(tuning: &WorldTuning) -> Vec<MapObject> {
    vec![
        MapObject {
            id: 0,
            x: 500.0,
            y: 200.0,
            z: Some(10.0),
            color: "#00FF00".to_string(),
            kind: ObjectKind::Tree { radius: 20.0 },
        },
        rock_at(300.0, 400.0, Some(tuning.rock_z), tuning),
        MapObject {
            id: 0,
            x: 700.0,
            y: 600.0,
            z: Some(0.0),
            color: "#00BFFF".to_string(),
            kind: ObjectKind::Water(Extent {
                width: 100.0,
                height: 50.0,
                depth: None,
            }),
        },
    ]
}

pub fn rock_at(x: f32, y: f32, z: Option<f32>, tuning: &WorldTuning) -> MapObject {
    MapObject {
        id: 0,
        x,
        y,
        z,
        color: tuning.rock_color.to_string(),
        kind: ObjectKind::Rock {
            radius: tuning.rock_radius,
        },
    }
}

pub fn random_rock<R: Rng>(rng: &mut R, tuning: &WorldTuning) -> MapObject {
    let (x, y) = random_position(rng, tuning);
    rock_at(x, y, Some(tuning.rock_z), tuning)
}

pub fn random_enemy<R: Rng>(rng: &mut R, world: &WorldTuning, enemy: &EnemyTuning) -> MapObject {
    let (x, y) = random_position(rng, world);
    MapObject {
        id: 0,
        x,
        y,
        z: Some(enemy.z),
        color: enemy.color.to_string(),
        kind: ObjectKind::Enemy {
            radius: enemy.radius,
            health: enemy.health,
            speed: enemy.speed,
        },
    }
}

// Uniform over the map minus the border margin on every side.
fn random_position<R: Rng>(rng: &mut R, tuning: &WorldTuning) -> (f32, f32) {
    let m = tuning.border_margin;
    let x = rng.gen_range(m..tuning.width - m);
    let y = rng.gen_range(m..tuning.height - m);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn when_spawning_randomly_then_positions_stay_inside_the_margin() {
        let tuning = WorldTuning::default();
        let enemy = EnemyTuning::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            for obj in [random_rock(&mut rng, &tuning), random_enemy(&mut rng, &tuning, &enemy)] {
                assert!(obj.x >= 100.0 && obj.x < 1900.0);
                assert!(obj.y >= 100.0 && obj.y < 1900.0);
            }
        }
    }

    #[test]
    fn when_enemy_spawns_then_it_has_full_health_and_fixed_speed() {
        let mut rng = StdRng::seed_from_u64(1);
        let obj = random_enemy(&mut rng, &WorldTuning::default(), &EnemyTuning::default());

        assert_eq!(
            obj.kind,
            ObjectKind::Enemy {
                radius: 12.0,
                health: 3,
                speed: 2.0
            }
        );
    }

    #[test]
    fn starting_world_is_tree_rock_water() {
        let names: Vec<&str> = starting_objects(&WorldTuning::default())
            .iter()
            .map(|o| o.kind.name())
            .collect();

        assert_eq!(names, vec!["tree", "rock", "water"]);
    }
}
