use crate::interface_adapters::net::Fanout;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::GameEvent;

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    JoinRefused,
    FanoutClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before a session id exists.
    static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let span = info_span!("conn", conn_id, session_id = tracing::field::Empty);
    serve_connection(socket, state).instrument(span).await
}

async fn serve_connection(mut socket: WebSocket, state: Arc<AppState>) {
    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::ERROR,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    Span::current().record("session_id", ctx.session_id.as_str());
    info!("client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub session_id: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub fanout_rx: broadcast::Receiver<Fanout>,
    pub latest_update_rx: watch::Receiver<Option<Fanout>>,
    // Fan-outs at or below this seq are already reflected in the init or a resync snapshot.
    pub synced_seq: u64,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,
    pub unknown_type: u32,

    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    // Subscribe before joining so nothing emitted after the init snapshot is missed.
    let fanout_rx = state.fanout_tx.subscribe();
    let latest_update_rx = state.latest_update_tx.subscribe();

    // The world task allocates the session id and spawns the player.
    let (reply, ack_rx) = oneshot::channel();
    state
        .input_tx
        .send(GameEvent::Join { reply })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let ack = ack_rx.await.map_err(|_| NetError::JoinRefused)?;

    // Seed the client with its id and the full world.
    let init = ServerMessage::init(ack.session_id.clone(), &ack.snapshot);
    let bytes_out = match send_message(socket, &init).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Compensate so the world does not keep a player nobody controls.
            state
                .input_tx
                .send(GameEvent::Leave {
                    session_id: ack.session_id,
                })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        session_id: ack.session_id,
        input_tx: state.input_tx.clone(),
        fanout_rx,
        latest_update_rx,
        synced_seq: ack.seq,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out: bytes_out as u64,

        invalid_json: 0,
        unknown_type: 0,

        last_world_lag_log: now,
        last_invalid_input_log: now,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing world event
            fanout = ctx.fanout_rx.recv() => {
                match fanout {
                    Ok(fanout) => {
                        if fanout.is_for(&ctx.session_id, ctx.synced_seq) {
                            matches!(forward_fanout(fanout, socket, ctx).await, LoopControl::Disconnect)
                        } else {
                            false
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "world events lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = ctx.latest_update_rx.borrow().clone();
                        match latest {
                            Some(snapshot)
                                if snapshot.accept_as_resync(&ctx.session_id, &mut ctx.synced_seq) =>
                            {
                                ctx.lag_recovery_count += 1;
                                matches!(
                                    forward_fanout(snapshot, socket, ctx).await,
                                    LoopControl::Disconnect
                                )
                            }
                            _ => false,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FanoutClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;
                handle_client_text(text.as_str(), ctx).await
            }
            Message::Binary(bytes) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += bytes.len() as u64;
                match std::str::from_utf8(&bytes) {
                    Ok(text) => handle_client_text(text, ctx).await,
                    Err(utf8_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                bytes = bytes.len(),
                                error = %utf8_err,
                                "binary client message is not utf-8"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            // Abrupt disconnects are handled exactly like a clean close.
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

// Text and binary frames share one JSON path; malformed input never closes the connection.
async fn handle_client_text(text: &str, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => {
            let Some(command) = msg.into_command() else {
                ctx.unknown_type += 1;
                return Ok(LoopControl::Continue);
            };
            // Backpressure here only slows this connection down.
            ctx.input_tx
                .send(GameEvent::Command {
                    session_id: ctx.session_id.clone(),
                    command,
                })
                .await
                .map_err(|_| NetError::InputClosed)?;
            Ok(LoopControl::Continue)
        }
        Err(parse_err) => {
            ctx.invalid_json += 1;
            if should_log(&mut ctx.last_invalid_input_log) {
                warn!(
                    bytes = text.len(),
                    error = %parse_err,
                    "failed to parse client message"
                );
            }
            Ok(LoopControl::Continue)
        }
    }
}

async fn forward_fanout(fanout: Fanout, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = fanout.text.len();
    match socket
        .send(Message::Text(fanout.text))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world event");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    // The world task ignores leaves for sessions it no longer knows.
    ctx.input_tx
        .send(GameEvent::Leave {
            session_id: ctx.session_id.clone(),
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        unknown_type = ctx.unknown_type,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");
    Ok(())
}
