// The world task: sole owner of WorldState and the serialization point for every mutation.

use super::commands::CommandProcessor;
use super::types::{CommandOutcome, GameEvent, JoinAck, WorldEvent, WorldEventKind, WorldSnapshot};
use crate::domain::systems::{enemy_ai, spawning};
use crate::domain::{Player, WorldState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

const SESSION_ID_LEN: usize = 9;
const SESSION_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Runtime configuration for one world.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    /// Capacity for inbound joins, leaves and commands.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world events.
    pub event_broadcast_capacity: usize,
    /// Period of the enemy AI tick.
    pub ai_tick_interval: Duration,
    /// Period of the rock spawn timer.
    pub rock_spawn_interval: Duration,
    /// Period of the enemy spawn timer.
    pub enemy_spawn_interval: Duration,
}

/// Channels into and out of a running world task.
#[derive(Clone)]
pub struct WorldHandle {
    /// Sender for joins, leaves and commands into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for world events; subscribe to observe the world.
    pub events_tx: broadcast::Sender<WorldEvent>,
}

/// Creates the channels and spawns the world task with a freshly seeded world.
pub fn spawn_world(settings: WorldSettings) -> WorldHandle {
    let processor = CommandProcessor::default();
    let world = WorldState::with_objects(spawning::starting_objects(&processor.world_tuning));
    spawn_world_with(settings, world, processor, StdRng::from_entropy())
}

pub fn spawn_world_with(
    settings: WorldSettings,
    world: WorldState,
    processor: CommandProcessor,
    rng: StdRng,
) -> WorldHandle {
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.input_channel_capacity);
    let (events_tx, _events_rx) =
        broadcast::channel::<WorldEvent>(settings.event_broadcast_capacity);

    tokio::spawn(world_task(
        input_rx,
        events_tx.clone(),
        settings,
        world,
        processor,
        rng,
    ));

    WorldHandle {
        input_tx,
        events_tx,
    }
}

struct World {
    state: WorldState,
    processor: CommandProcessor,
    rng: StdRng,
    events_tx: broadcast::Sender<WorldEvent>,
    // Sequence number of the last emitted event.
    seq: u64,
}

impl World {
    fn emit(&mut self, kind: WorldEventKind) {
        self.seq += 1;
        // No subscribers is fine; the next snapshot carries the same state.
        let _ = self.events_tx.send(WorldEvent {
            seq: self.seq,
            kind,
        });
    }

    fn emit_update(&mut self) {
        let snapshot = WorldSnapshot::from(&self.state);
        self.emit(WorldEventKind::Update(snapshot));
    }

    fn handle(&mut self, event: GameEvent) {
        match event {
            GameEvent::Join { reply } => self.join(reply),
            GameEvent::Leave { session_id } => {
                if self.state.remove_player(&session_id).is_some() {
                    info!(session_id = %session_id, "player left");
                    self.emit(WorldEventKind::PlayerLeft { id: session_id });
                }
            }
            GameEvent::Command {
                session_id,
                command,
            } => {
                let now = now_millis();
                match self
                    .processor
                    .apply(&mut self.state, &session_id, command, now, &mut self.rng)
                {
                    Ok(CommandOutcome::Updated) => self.emit_update(),
                    Ok(CommandOutcome::Chat(text)) => self.emit(WorldEventKind::Chat { text }),
                    Err(e) => {
                        debug!(session_id = %session_id, error = ?e, "command rejected");
                    }
                }
            }
        }
    }

    fn join(&mut self, reply: tokio::sync::oneshot::Sender<JoinAck>) {
        let session_id = loop {
            let candidate = new_session_id(&mut self.rng);
            if !self.state.contains_player(&candidate) {
                break candidate;
            }
        };

        let tuning = &self.processor.world_tuning;
        let player = Player {
            id: session_id.clone(),
            x: tuning.spawn_x,
            y: tuning.spawn_y,
            z: Some(tuning.spawn_z),
            color: tuning.default_player_color.to_string(),
            team: None,
            last_update: now_millis(),
        };
        self.state.insert_player(player.clone());

        let ack = JoinAck {
            session_id: session_id.clone(),
            seq: self.seq,
            snapshot: WorldSnapshot::from(&self.state),
        };
        if reply.send(ack).is_err() {
            // Connection went away before it could be seeded.
            self.state.remove_player(&session_id);
            debug!(session_id = %session_id, "join abandoned");
            return;
        }

        info!(session_id = %session_id, "player joined");
        self.emit(WorldEventKind::PlayerJoined(player));
    }
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    events_tx: broadcast::Sender<WorldEvent>,
    settings: WorldSettings,
    state: WorldState,
    processor: CommandProcessor,
    rng: StdRng,
) {
    let mut world = World {
        state,
        processor,
        rng,
        events_tx,
        seq: 0,
    };

    // Timers fire one full period after startup, not immediately.
    let mut ai_timer = interval_at(
        Instant::now() + settings.ai_tick_interval,
        settings.ai_tick_interval,
    );
    let mut rock_timer = interval_at(
        Instant::now() + settings.rock_spawn_interval,
        settings.rock_spawn_interval,
    );
    let mut enemy_timer = interval_at(
        Instant::now() + settings.enemy_spawn_interval,
        settings.enemy_spawn_interval,
    );

    loop {
        tokio::select! {
            event = input_rx.recv() => {
                match event {
                    Some(event) => world.handle(event),
                    None => {
                        // Every sender is gone; nobody can reach this world any more.
                        info!("input channel closed; world task exiting");
                        break;
                    }
                }
            }
            _ = ai_timer.tick() => {
                let (players, objects) = world.state.roster_and_objects_mut();
                enemy_ai::step_enemies(players, objects);
                world.emit_update();
            }
            _ = rock_timer.tick() => {
                let rock = spawning::random_rock(&mut world.rng, &world.processor.world_tuning);
                let id = world.state.insert_object(rock);
                info!(object_id = id, "rock spawned");
                world.emit_update();
            }
            _ = enemy_timer.tick() => {
                let tuning = &world.processor;
                let enemy =
                    spawning::random_enemy(&mut world.rng, &tuning.world_tuning, &tuning.enemy_tuning);
                let id = world.state.insert_object(enemy);
                info!(object_id = id, "enemy spawned");
                world.emit_update();
            }
        }
    }
}

fn new_session_id<R: Rng>(rng: &mut R) -> String {
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::types::Command;
    use tokio::sync::oneshot;

    fn settings(ai_tick: Duration) -> WorldSettings {
        WorldSettings {
            input_channel_capacity: 64,
            event_broadcast_capacity: 1024,
            ai_tick_interval: ai_tick,
            rock_spawn_interval: Duration::from_secs(30),
            enemy_spawn_interval: Duration::from_secs(20),
        }
    }

    fn spawn_test_world(ai_tick: Duration) -> WorldHandle {
        let processor = CommandProcessor::default();
        let world = WorldState::with_objects(spawning::starting_objects(&processor.world_tuning));
        spawn_world_with(settings(ai_tick), world, processor, StdRng::seed_from_u64(9))
    }

    async fn join(handle: &WorldHandle) -> JoinAck {
        let (reply, rx) = oneshot::channel();
        handle
            .input_tx
            .send(GameEvent::Join { reply })
            .await
            .expect("world task alive");
        rx.await.expect("join ack")
    }

    fn last_update(rx: &mut broadcast::Receiver<WorldEvent>) -> Option<WorldSnapshot> {
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let WorldEventKind::Update(snapshot) = event.kind {
                last = Some(snapshot);
            }
        }
        last
    }

    fn count(snapshot: &WorldSnapshot, kind: &str) -> usize {
        snapshot
            .objects
            .iter()
            .filter(|o| o.kind.name() == kind)
            .count()
    }

    #[tokio::test]
    async fn when_player_joins_then_ack_contains_only_that_player_and_starting_world() {
        let handle = spawn_test_world(Duration::from_secs(3600));

        let ack = join(&handle).await;

        assert_eq!(ack.session_id.len(), SESSION_ID_LEN);
        assert_eq!(ack.snapshot.players.len(), 1);
        assert!(ack.snapshot.players.contains_key(&ack.session_id));
        assert_eq!(ack.snapshot.objects.len(), 3);
    }

    #[tokio::test]
    async fn when_second_player_joins_then_joined_event_is_emitted_after_ack_seq() {
        let handle = spawn_test_world(Duration::from_secs(3600));
        let mut rx = handle.events_tx.subscribe();
        let first = join(&handle).await;

        let second = join(&handle).await;

        assert_ne!(first.session_id, second.session_id);
        let mut joined = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let WorldEventKind::PlayerJoined(player) = event.kind {
                joined.push((event.seq, player.id));
            }
        }
        let (seq, id) = joined.last().cloned().expect("joined event");
        assert_eq!(id, second.session_id);
        assert!(seq > second.seq);
    }

    #[tokio::test]
    async fn when_player_leaves_then_left_event_is_emitted_and_roster_shrinks() {
        let handle = spawn_test_world(Duration::from_secs(3600));
        let ack = join(&handle).await;
        let mut rx = handle.events_tx.subscribe();

        handle
            .input_tx
            .send(GameEvent::Leave {
                session_id: ack.session_id.clone(),
            })
            .await
            .expect("send leave");
        let other = join(&handle).await;

        assert!(!other.snapshot.players.contains_key(&ack.session_id));
        let left = std::iter::from_fn(|| rx.try_recv().ok()).find_map(|e| match e.kind {
            WorldEventKind::PlayerLeft { id } => Some(id),
            _ => None,
        });
        assert_eq!(left, Some(ack.session_id));
    }

    #[tokio::test]
    async fn when_command_is_applied_then_update_reflects_it() {
        let handle = spawn_test_world(Duration::from_secs(3600));
        let ack = join(&handle).await;
        let mut rx = handle.events_tx.subscribe();

        handle
            .input_tx
            .send(GameEvent::Command {
                session_id: ack.session_id.clone(),
                command: Command::Move {
                    x: 10.0,
                    y: 20.0,
                    z: None,
                },
            })
            .await
            .expect("send move");

        let event = rx.recv().await.expect("event");
        let WorldEventKind::Update(snapshot) = event.kind else {
            panic!("expected update, got {:?}", event.kind);
        };
        let player = &snapshot.players[&ack.session_id];
        assert_eq!((player.x, player.y), (10.0, 20.0));
    }

    #[tokio::test(start_paused = true)]
    async fn when_spawn_periods_elapse_then_rocks_and_enemies_are_added() {
        let handle = spawn_test_world(Duration::from_secs(3600));
        let mut rx = handle.events_tx.subscribe();

        // 2 rock periods (30 s) and 3 enemy periods (20 s).
        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = last_update(&mut rx).expect("spawn updates");
        assert_eq!(count(&snapshot, "rock"), 1 + 2);
        assert_eq!(count(&snapshot, "enemy"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn when_ai_ticks_then_enemy_closes_in_on_player() {
        let handle = spawn_test_world(Duration::from_millis(100));
        let ack = join(&handle).await;
        let mut rx = handle.events_tx.subscribe();

        // Let one enemy spawn, then watch a few ticks.
        tokio::time::sleep(Duration::from_millis(20_050)).await;
        let before = last_update(&mut rx).expect("update");
        tokio::time::sleep(Duration::from_millis(500)).await;
        let after = last_update(&mut rx).expect("update");

        let player = &after.players[&ack.session_id];
        let dist = |s: &WorldSnapshot| {
            let e = s.objects.iter().find(|o| o.is_enemy()).expect("enemy");
            ((player.x - e.x).powi(2) + (player.y - e.y).powi(2)).sqrt()
        };
        assert!(dist(&after) < dist(&before));
    }

    #[tokio::test(start_paused = true)]
    async fn when_nobody_is_connected_then_enemies_do_not_move() {
        let handle = spawn_test_world(Duration::from_millis(100));
        let mut rx = handle.events_tx.subscribe();

        tokio::time::sleep(Duration::from_millis(20_050)).await;
        let before = last_update(&mut rx).expect("update");
        tokio::time::sleep(Duration::from_millis(500)).await;
        let after = last_update(&mut rx).expect("update");

        assert_eq!(before.objects, after.objects);
    }
}
