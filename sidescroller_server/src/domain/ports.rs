use async_trait::async_trait;

use crate::domain::state::SessionDescriptor;

/// Settings for a session the host wants to advertise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub server_name: String,
    pub host_user_name: String,
    pub max_players: u16,
    pub connect_address: String,
    pub presence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionQuery {
    pub presence: bool,
    pub max_results: usize,
}

/// One hit of a session search with the address clients travel to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSearchResult {
    pub descriptor: SessionDescriptor,
    pub connect_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    AlreadyExists,
    NotFound,
    /// The search was dropped by the backend before it completed.
    SearchInvalidated,
    Unavailable,
}

// Port for the online subsystem that advertises and discovers sessions.
#[async_trait]
pub trait OnlineBackend: Send + Sync {
    async fn create_session(&self, settings: SessionSettings) -> Result<(), BackendError>;
    async fn destroy_session(&self, server_name: &str) -> Result<(), BackendError>;
    async fn session_exists(&self, server_name: &str) -> Result<bool, BackendError>;
    async fn find_sessions(
        &self,
        query: SessionQuery,
    ) -> Result<Vec<SessionSearchResult>, BackendError>;
}
