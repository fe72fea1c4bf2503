// Shared server and session/lobby helpers for the integration tests.
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use sidescroller_server::domain::ports::SessionSettings;
use sidescroller_server::interface_adapters::clients::backend::HttpSessionBackend;
use sidescroller_server::use_cases::SessionDirectory;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

static BASE_URL: OnceLock<String> = OnceLock::new();

/// Starts the session server once per test binary and returns its base URL.
pub fn ensure_server() -> &'static str {
    BASE_URL.get_or_init(|| {
        let bound = Arc::new(OnceLock::<String>::new());
        let publish = Arc::clone(&bound);
        // Its own OS thread keeps the server alive across `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("server runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral port");
                let addr = listener.local_addr().expect("local addr");
                let _ = publish.set(format!("http://{addr}"));
                sidescroller_server::run(listener)
                    .await
                    .expect("session server failed");
            });
        });
        wait_until_accepting(&bound)
    })
}

fn wait_until_accepting(bound: &OnceLock<String>) -> String {
    let base_url = loop {
        if let Some(url) = bound.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let addr = host_port(&base_url).to_string();

    // Hosting the session happens before the listener accepts.
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return base_url;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("session server did not start accepting in time");
}

fn host_port(base_url: &str) -> &str {
    base_url
        .strip_prefix("http://")
        .expect("base url should use http://")
}

pub fn ws_url() -> String {
    format!("ws://{}/ws", host_port(ensure_server()))
}

pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

pub fn session_settings(name: &str, connect_address: &str, max_players: u16) -> SessionSettings {
    SessionSettings {
        server_name: name.to_string(),
        host_user_name: "Tester".to_string(),
        max_players,
        connect_address: connect_address.to_string(),
        presence: true,
    }
}

/// Session directory that hosts and searches through the test server's HTTP API.
pub fn http_directory() -> SessionDirectory {
    let backend =
        HttpSessionBackend::new(ensure_server(), Duration::from_secs(2)).expect("http backend");
    SessionDirectory::new(Some(Arc::new(backend)))
}

/// Registers a session through `POST /sessions` and returns the status.
pub async fn create_session(client: &reqwest::Client, name: &str) -> reqwest::StatusCode {
    let payload = serde_json::json!({
        "server_name": name,
        "host_user_name": "Tester",
        "max_players": 4,
        "connect_address": "127.0.0.1:4555",
    });
    client
        .post(format!("{}/sessions", ensure_server()))
        .json(&payload)
        .send()
        .await
        .expect("create request")
        .status()
}

pub async fn connect() -> Socket {
    let (socket, _) = connect_async(ws_url()).await.expect("websocket connect");
    socket
}

pub async fn send_json(socket: &mut Socket, value: serde_json::Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

pub async fn send_join(socket: &mut Socket) {
    let name = format!("p-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    send_json(
        socket,
        serde_json::json!({"type": "Join", "data": {"display_name": name}}),
    )
    .await;
}

/// Connects, completes the join handshake and returns the socket with the
/// connection id from the identity message.
pub async fn join_lobby() -> (Socket, String) {
    let mut socket = connect().await;
    send_join(&mut socket).await;
    let identity = next_matching(&mut socket, |v| v["type"] == "Identity").await;
    let connection_id = identity["data"]["connection_id"]
        .as_str()
        .expect("connection id string")
        .to_string();
    (socket, connection_id)
}

pub async fn select_character(socket: &mut Socket, archetype: &str) {
    send_json(
        socket,
        serde_json::json!({
            "type": "SpawnPlayer",
            "data": {"archetype": archetype, "label": archetype},
        }),
    )
    .await;
}

/// Reads text frames until one matches, skipping world updates and other traffic.
pub async fn next_matching(
    socket: &mut Socket,
    matches: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = socket
                .next()
                .await
                .expect("stream open")
                .expect("valid frame");
            if let Message::Text(text) = msg {
                let value: serde_json::Value =
                    serde_json::from_str(text.as_str()).expect("json message");
                if matches(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("expected message in time")
}
