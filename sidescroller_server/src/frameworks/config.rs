use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn session_name() -> String {
    env::var("SESSION_NAME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "sidescroller".to_string())
}

pub fn max_players() -> u16 {
    env::var("MAX_PLAYERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(6)
}

pub fn min_players_to_start() -> u32 {
    env::var("MIN_PLAYERS_TO_START")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3)
}

/// Which online backend advertises and discovers sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBackendKind {
    // This process's own registry.
    Local,
    // A remote registry speaking the /sessions routes.
    Http(String),
    // No backend; hosting fails.
    None,
}

pub fn session_backend() -> SessionBackendKind {
    match env::var("SESSION_BACKEND").as_deref() {
        Ok("none") => SessionBackendKind::None,
        Ok("http") => SessionBackendKind::Http(session_backend_url()),
        _ => SessionBackendKind::Local,
    }
}

pub fn session_backend_url() -> String {
    env::var("SESSION_BACKEND_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string())
}

pub fn session_backend_timeout() -> Duration {
    let millis = env::var("SESSION_BACKEND_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub fn levels_path() -> Option<PathBuf> {
    env::var("LEVELS_PATH").ok().map(PathBuf::from)
}

pub fn save_game_path() -> PathBuf {
    env::var("SAVE_GAME_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("save_game.json"))
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const NOTICE_BROADCAST_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
