use crate::domain::state::{MapObject, ObjectKind, Player};
use std::collections::BTreeMap;

/// Advances every enemy one step toward its nearest player.
///
/// Distance is measured on the top-down (x, y) plane. Ties go to the first player in
/// roster order. An enemy closer than its speed lands on the player. Returns the number of
/// enemies that moved.
pub fn step_enemies(players: &BTreeMap<String, Player>, objects: &mut [MapObject]) -> usize {
    if players.is_empty() {
        return 0;
    }

    let mut moved = 0;
    for obj in objects.iter_mut() {
        let ObjectKind::Enemy { speed, .. } = obj.kind else {
            continue;
        };

        let Some((dx, dy, distance)) = nearest_offset(players, obj.x, obj.y) else {
            continue;
        };

        if distance > 0.0 {
            // Never step past the target; a close enemy lands on it and stops.
            let step = speed.min(distance);
            obj.x += dx / distance * step;
            obj.y += dy / distance * step;
            moved += 1;
        }
    }
    moved
}

// Offset and distance from (x, y) to the closest player.
fn nearest_offset(players: &BTreeMap<String, Player>, x: f32, y: f32) -> Option<(f32, f32, f32)> {
    let mut best: Option<(f32, f32, f32)> = None;
    for p in players.values() {
        let dx = p.x - x;
        let dy = p.y - y;
        let distance = (dx * dx + dy * dy).sqrt();
        // Strict comparison keeps the earliest player on ties.
        if best.is_none_or(|(_, _, d)| distance < d) {
            best = Some((dx, dy, distance));
        }
    }
    best
}
