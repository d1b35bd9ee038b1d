// Validates and applies one client command against the world.

use super::types::{Command, CommandOutcome};
use crate::domain::systems::spawning::rock_at;
use crate::domain::tuning::{EnemyTuning, WorldTuning};
use crate::domain::{CommandError, ObjectId, ObjectKind, Team, WorldState};
use rand::Rng;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct CommandProcessor {
    pub world_tuning: WorldTuning,
    pub enemy_tuning: EnemyTuning,
}

impl CommandProcessor {
    /// Applies `command` on behalf of `session_id`.
    ///
    /// A rejected command leaves the world untouched.
    pub fn apply<R: Rng>(
        &self,
        world: &mut WorldState,
        session_id: &str,
        command: Command,
        now_millis: u64,
        rng: &mut R,
    ) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Move { x, y, z } => {
                let player = world
                    .player_mut(session_id)
                    .ok_or(CommandError::UnknownPlayer)?;
                player.x = x;
                player.y = y;
                player.z = z;
                player.last_update = now_millis;
                Ok(CommandOutcome::Updated)
            }
            Command::Collect { id } => {
                let object = world.object(id).ok_or(CommandError::UnknownObject(id))?;
                if !matches!(object.kind, ObjectKind::Rock { .. }) {
                    return Err(CommandError::WrongKind {
                        id,
                        expected: "rock",
                        found: object.kind.name(),
                    });
                }
                world.remove_object(id);
                Ok(CommandOutcome::Updated)
            }
            Command::Craft { object } => {
                // Crafting cost is enforced by the client only.
                world.insert_object(object);
                Ok(CommandOutcome::Updated)
            }
            Command::HitEnemy { id, damage } => {
                self.damage_enemy(world, id, Some(damage), rng)?;
                Ok(CommandOutcome::Updated)
            }
            Command::KillEnemy { id } => {
                self.damage_enemy(world, id, None, rng)?;
                Ok(CommandOutcome::Updated)
            }
            Command::SetTeam { team } => {
                let player = world
                    .player_mut(session_id)
                    .ok_or(CommandError::UnknownPlayer)?;
                player.team = Some(team);
                player.color = match team {
                    Team::Red => self.world_tuning.red_color,
                    Team::Blue => self.world_tuning.blue_color,
                }
                .to_string();
                Ok(CommandOutcome::Updated)
            }
            Command::Chat { text } => {
                let player = world.player(session_id).ok_or(CommandError::UnknownPlayer)?;
                let team = player.team.map(Team::label).unwrap_or("No Team");
                Ok(CommandOutcome::Chat(format!("[{team}] {session_id}: {text}")))
            }
        }
    }

    // `None` damage is lethal regardless of remaining health.
    fn damage_enemy<R: Rng>(
        &self,
        world: &mut WorldState,
        id: ObjectId,
        damage: Option<i32>,
        rng: &mut R,
    ) -> Result<(), CommandError> {
        let object = world.object_mut(id).ok_or(CommandError::UnknownObject(id))?;
        let health = match &mut object.kind {
            ObjectKind::Enemy { health, .. } => health,
            other => {
                return Err(CommandError::WrongKind {
                    id,
                    expected: "enemy",
                    found: other.name(),
                });
            }
        };

        *health = match damage {
            Some(damage) => health.saturating_sub(damage),
            None => 0,
        };
        let remaining = *health;
        let (x, y, z) = (object.x, object.y, object.z);
        info!(object_id = id, health = remaining, "enemy hit");
        if remaining > 0 {
            return Ok(());
        }

        world.remove_object(id);
        if rng.gen_bool(self.enemy_tuning.rock_drop_chance) {
            world.insert_object(rock_at(x, y, z, &self.world_tuning));
            info!(object_id = id, "enemy dropped a rock");
        }
        Ok(())
    }
}
