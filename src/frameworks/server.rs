// Framework bootstrap for the world server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{Fanout, spawn_world_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{WorldSettings, spawn_world};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// World settings assembled from the environment.
pub fn world_settings() -> WorldSettings {
    WorldSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        event_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        ai_tick_interval: config::ai_tick_interval(),
        rock_spawn_interval: config::rock_spawn_interval(),
        enemy_spawn_interval: config::enemy_spawn_interval(),
    }
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_with_settings(listener, world_settings()).await
}

pub async fn run_with_settings(
    listener: tokio::net::TcpListener,
    settings: WorldSettings,
) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(settings);

    // The browser client connects to the bare host; `/ws` is kept for explicit clients.
    let app = Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::http_host(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(settings: WorldSettings) -> Arc<AppState> {
    let fanout_capacity = settings.event_broadcast_capacity;
    tracing::debug!(
        ai_tick_ms = settings.ai_tick_interval.as_millis(),
        rock_spawn_secs = settings.rock_spawn_interval.as_secs(),
        enemy_spawn_secs = settings.enemy_spawn_interval.as_secs(),
        "world configured"
    );

    // Spawn the authoritative world task; it owns all world state.
    let world = spawn_world(settings);

    // Serialized events shared across all connections.
    let (fanout_tx, _fanout_rx) = broadcast::channel::<Fanout>(fanout_capacity);
    let (latest_update_tx, _latest_update_rx) = watch::channel::<Option<Fanout>>(None);
    spawn_world_serializer(&world, fanout_tx.clone(), latest_update_tx.clone());

    Arc::new(AppState {
        input_tx: world.input_tx,
        fanout_tx,
        latest_update_tx,
    })
}
