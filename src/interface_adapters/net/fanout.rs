// Serializes world events once and fans the shared bytes out to every connection.

use crate::interface_adapters::protocol::{PlayerDto, ServerMessage};
use crate::use_cases::{WorldEvent, WorldEventKind, WorldHandle};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, warn};

/// One serialized server message, shared by every connection.
#[derive(Debug, Clone)]
pub struct Fanout {
    pub seq: u64,
    // Session that must not receive this message (its own join announcement).
    pub except: Option<Arc<str>>,
    pub text: Utf8Bytes,
}

impl Fanout {
    /// True if `session_id` should receive this message given the seq it is synced to.
    pub fn is_for(&self, session_id: &str, synced_seq: u64) -> bool {
        self.seq > synced_seq && self.except.as_deref() != Some(session_id)
    }

    /// Accepts a lag-recovery snapshot, moving `synced_seq` up to it so queued fan-outs the
    /// snapshot already covers are skipped. Events folded into the snapshot (chat, joins and
    /// leaves) are not replayed.
    pub fn accept_as_resync(&self, session_id: &str, synced_seq: &mut u64) -> bool {
        if !self.is_for(session_id, *synced_seq) {
            return false;
        }
        *synced_seq = self.seq;
        true
    }
}

fn encode(event: WorldEvent) -> Result<Fanout, serde_json::Error> {
    let (msg, except) = match event.kind {
        WorldEventKind::Update(snapshot) => (ServerMessage::update(&snapshot), None),
        WorldEventKind::PlayerJoined(player) => {
            let except = Some(Arc::from(player.id.as_str()));
            let msg = ServerMessage::PlayerJoined {
                player: PlayerDto::from(&player),
            };
            (msg, except)
        }
        WorldEventKind::PlayerLeft { id } => (ServerMessage::PlayerLeft { id }, None),
        WorldEventKind::Chat { text } => (ServerMessage::Chat { text }, None),
    };
    let text = serde_json::to_string(&msg)?;
    Ok(Fanout {
        seq: event.seq,
        except,
        text: Utf8Bytes::from(text),
    })
}

pub async fn world_event_serializer(
    mut events_rx: broadcast::Receiver<WorldEvent>,
    fanout_tx: broadcast::Sender<Fanout>,
    latest_update_tx: watch::Sender<Option<Fanout>>,
) {
    // Serialize each world event once and broadcast the shared bytes.
    loop {
        match events_rx.recv().await {
            Ok(event) => {
                let is_update = matches!(event.kind, WorldEventKind::Update(_));
                let fanout = match encode(event) {
                    Ok(fanout) => fanout,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world event");
                        continue;
                    }
                };

                // Store the latest snapshot for lag recovery.
                if is_update {
                    latest_update_tx.send_replace(Some(fanout.clone()));
                }
                // Having no connections is not an error.
                let _ = fanout_tx.send(fanout);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "world serializer lagged; skipping to latest event");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world events channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_world_serializer(
    world: &WorldHandle,
    fanout_tx: broadcast::Sender<Fanout>,
    latest_update_tx: watch::Sender<Option<Fanout>>,
) {
    tokio::spawn(world_event_serializer(
        world.events_tx.subscribe(),
        fanout_tx,
        latest_update_tx,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Player;

    fn player(id: &str) -> Player {
        Player {
            id: id.to_string(),
            x: 400.0,
            y: 300.0,
            z: None,
            color: "#FF0000".to_string(),
            team: None,
            last_update: 0,
        }
    }

    #[test]
    fn when_player_joins_then_announcement_skips_that_player() {
        let fanout = encode(WorldEvent {
            seq: 4,
            kind: WorldEventKind::PlayerJoined(player("new")),
        })
        .expect("encode");

        assert!(!fanout.is_for("new", 0));
        assert!(fanout.is_for("old", 0));
        assert!(fanout.text.as_str().contains(r#""type":"playerJoined""#));
    }

    #[test]
    fn when_event_predates_init_then_it_is_not_delivered() {
        let fanout = encode(WorldEvent {
            seq: 7,
            kind: WorldEventKind::Chat { text: "hi".into() },
        })
        .expect("encode");

        assert!(!fanout.is_for("a", 7));
        assert!(fanout.is_for("a", 6));
    }

    #[test]
    fn when_resync_snapshot_is_accepted_then_older_queued_events_are_skipped() {
        let snapshot = encode(WorldEvent {
            seq: 10,
            kind: WorldEventKind::Update(crate::use_cases::WorldSnapshot {
                players: Default::default(),
                objects: Vec::new(),
            }),
        })
        .expect("encode");
        let stale = encode(WorldEvent {
            seq: 9,
            kind: WorldEventKind::Chat { text: "old".into() },
        })
        .expect("encode");
        let fresh = encode(WorldEvent {
            seq: 11,
            kind: WorldEventKind::Chat { text: "new".into() },
        })
        .expect("encode");
        let mut synced_seq = 3;

        assert!(snapshot.accept_as_resync("a", &mut synced_seq));

        assert_eq!(synced_seq, 10);
        assert!(!stale.is_for("a", synced_seq));
        assert!(fresh.is_for("a", synced_seq));
        // The same snapshot is not sent twice.
        assert!(!snapshot.accept_as_resync("a", &mut synced_seq));
    }

    #[tokio::test]
    async fn when_update_is_serialized_then_latest_snapshot_is_stored() {
        let (events_tx, events_rx) = broadcast::channel(8);
        let (fanout_tx, mut fanout_rx) = broadcast::channel(8);
        let (latest_tx, latest_rx) = watch::channel(None);
        tokio::spawn(world_event_serializer(events_rx, fanout_tx, latest_tx));

        events_tx
            .send(WorldEvent {
                seq: 1,
                kind: WorldEventKind::Update(crate::use_cases::WorldSnapshot {
                    players: Default::default(),
                    objects: Vec::new(),
                }),
            })
            .expect("send");

        let fanout = fanout_rx.recv().await.expect("fanout");
        assert_eq!(fanout.seq, 1);
        assert!(fanout.text.as_str().starts_with(r#"{"type":"update""#));
        assert_eq!(latest_rx.borrow().as_ref().map(|f| f.seq), Some(1));
    }
}
