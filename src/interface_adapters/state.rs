use crate::interface_adapters::net::Fanout;
use crate::use_cases::GameEvent;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Joins, leaves and commands flowing from the network into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Serialized world events, shared across all connections.
    pub fanout_tx: broadcast::Sender<Fanout>,
    // Latest serialized snapshot for lag recovery.
    pub latest_update_tx: watch::Sender<Option<Fanout>>,
}
