use crate::domain::ConnectionId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out connection ids for accepted sockets.
///
/// Ids start at 1 and are never reused while the server runs, so per-connection
/// state in the world task (character choices, respawn menus) cannot be picked
/// up by a later socket.
#[derive(Debug)]
pub struct ConnectionIds {
    next: AtomicU64,
}

impl Default for ConnectionIds {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl ConnectionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> ConnectionId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
