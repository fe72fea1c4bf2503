use crate::interface_adapters::utils::connection_ids::ConnectionIds;
use crate::use_cases::{
    FlowNotice, GameEvent, ServerState, SessionDirectory, SessionRegistry,
};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

pub struct AppState {
    // Source of ids for accepted sockets.
    pub connection_ids: ConnectionIds,
    // Inputs flowing from the network into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Serialized world updates, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized world update for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    // Travel, respawn and level notices; filtered per connection.
    pub notice_tx: broadcast::Sender<FlowNotice>,
    // High-level flow state (lobby/level/menus).
    pub server_state_tx: watch::Sender<ServerState>,
    // Sessions advertised through this process.
    pub registry: Arc<SessionRegistry>,
    // Host/search/join flow over the configured online backend.
    pub directory: Arc<SessionDirectory>,
    // Name this server hosts its own session under.
    pub session_name: Arc<str>,
}
