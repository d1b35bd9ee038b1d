// Shared helpers for integration tests: a real server on an ephemeral port and a JSON ws client.
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use world_server::use_cases::WorldSettings;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Upper bound for any single expected message; AI ticks arrive every 100 ms.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Start a fresh server (its own world) and return the ws URL.
pub async fn start_server() -> String {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");

    let settings = WorldSettings {
        input_channel_capacity: 1024,
        event_broadcast_capacity: 1024,
        ai_tick_interval: Duration::from_millis(100),
        rock_spawn_interval: Duration::from_secs(30),
        enemy_spawn_interval: Duration::from_secs(20),
    };
    tokio::spawn(async move {
        world_server::run_with_settings(listener, settings)
            .await
            .expect("server failed");
    });

    // The listener is already bound, so connects queue up until the router runs.
    format!("ws://{addr}/ws")
}

pub async fn connect(url: &str) -> Client {
    let (client, _response) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    client
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .expect("send message");
}

pub async fn send_raw(client: &mut Client, text: &str) {
    client
        .send(Message::text(text.to_string()))
        .await
        .expect("send raw message");
}

pub async fn send_binary(client: &mut Client, bytes: Vec<u8>) {
    client
        .send(Message::binary(bytes))
        .await
        .expect("send binary message");
}

// Read messages until one satisfies `pred`, skipping everything else (mostly AI tick updates).
pub async fn next_matching(client: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            let msg = client
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).expect("server sent json");
                if pred(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

pub async fn next_of_type(client: &mut Client, ty: &str) -> Value {
    next_matching(client, |v| v["type"] == ty).await
}

// Connect and consume the init message, returning the assigned session id and the init payload.
pub async fn join(url: &str) -> (Client, String, Value) {
    let mut client = connect(url).await;
    let init = next_of_type(&mut client, "init").await;
    let id = init["id"].as_str().expect("init id").to_string();
    (client, id, init)
}
