// In-process registry of advertised sessions, served over HTTP.

use crate::domain::SessionDescriptor;
use crate::domain::ports::{
    BackendError, OnlineBackend, SessionQuery, SessionSearchResult, SessionSettings,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Errors returned by session registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Session already exists and cannot be re-created.
    AlreadyExists,
    NotFound,
}

#[derive(Debug, Clone)]
struct RegisteredSession {
    settings: SessionSettings,
    current_players: u16,
}

impl RegisteredSession {
    fn search_result(&self) -> SessionSearchResult {
        SessionSearchResult {
            descriptor: SessionDescriptor {
                server_name: self.settings.server_name.clone(),
                host_user_name: self.settings.host_user_name.clone(),
                current_players: self.current_players,
                max_players: self.settings.max_players,
            },
            connect_address: self.settings.connect_address.clone(),
        }
    }
}

/// Thread-safe registry for advertised sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Map of server name to session.
    sessions: RwLock<HashMap<String, RegisteredSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, settings: SessionSettings) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&settings.server_name) {
            return Err(RegistryError::AlreadyExists);
        }
        info!(server_name = %settings.server_name, "session registered");
        sessions.insert(
            settings.server_name.clone(),
            RegisteredSession {
                settings,
                current_players: 0,
            },
        );
        Ok(())
    }

    pub async fn destroy(&self, server_name: &str) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(server_name) {
            Some(_) => {
                info!(server_name, "session removed");
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    pub async fn get(&self, server_name: &str) -> Option<SessionSearchResult> {
        let sessions = self.sessions.read().await;
        sessions.get(server_name).map(RegisteredSession::search_result)
    }

    /// Sessions sorted by name, optionally only those advertised with presence.
    pub async fn list(&self, query: SessionQuery) -> Vec<SessionSearchResult> {
        let sessions = self.sessions.read().await;
        let mut results: Vec<SessionSearchResult> = sessions
            .values()
            .filter(|session| !query.presence || session.settings.presence)
            .map(RegisteredSession::search_result)
            .collect();
        results.sort_by(|a, b| a.descriptor.server_name.cmp(&b.descriptor.server_name));
        results.truncate(query.max_results);
        results
    }

    /// Increments the active player count for a session.
    pub async fn register_connection(&self, server_name: &str) -> Option<u16> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(server_name)?;
        session.current_players = session.current_players.saturating_add(1);
        debug!(server_name, players = session.current_players, "session player joined");
        Some(session.current_players)
    }

    /// Decrements the active player count for a session.
    pub async fn register_disconnect(&self, server_name: &str) -> Option<u16> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(server_name)?;
        session.current_players = session.current_players.saturating_sub(1);
        debug!(server_name, players = session.current_players, "session player left");
        Some(session.current_players)
    }
}

#[async_trait]
impl OnlineBackend for SessionRegistry {
    async fn create_session(&self, settings: SessionSettings) -> Result<(), BackendError> {
        self.create(settings).await.map_err(|err| match err {
            RegistryError::AlreadyExists => BackendError::AlreadyExists,
            RegistryError::NotFound => BackendError::NotFound,
        })
    }

    async fn destroy_session(&self, server_name: &str) -> Result<(), BackendError> {
        self.destroy(server_name)
            .await
            .map_err(|_| BackendError::NotFound)
    }

    async fn session_exists(&self, server_name: &str) -> Result<bool, BackendError> {
        Ok(self.get(server_name).await.is_some())
    }

    async fn find_sessions(
        &self,
        query: SessionQuery,
    ) -> Result<Vec<SessionSearchResult>, BackendError> {
        Ok(self.list(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(name: &str, presence: bool) -> SessionSettings {
        SessionSettings {
            server_name: name.to_string(),
            host_user_name: "Host".to_string(),
            max_players: 6,
            connect_address: "127.0.0.1:3001".to_string(),
            presence,
        }
    }

    const ALL: SessionQuery = SessionQuery {
        presence: false,
        max_results: 100,
    };

    #[tokio::test]
    async fn when_name_is_taken_then_create_fails() {
        let registry = SessionRegistry::new();
        registry.create(settings("a", true)).await.expect("create");

        assert_eq!(
            registry.create(settings("a", true)).await,
            Err(RegistryError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn when_presence_requested_then_hidden_sessions_are_filtered() {
        let registry = SessionRegistry::new();
        registry.create(settings("b", true)).await.expect("create");
        registry.create(settings("a", false)).await.expect("create");

        let visible = registry
            .list(SessionQuery {
                presence: true,
                max_results: 100,
            })
            .await;
        let all = registry.list(ALL).await;

        assert_eq!(visible.len(), 1);
        assert_eq!(all[0].descriptor.server_name, "a");
        assert_eq!(all[1].descriptor.server_name, "b");
    }

    #[tokio::test]
    async fn when_players_connect_and_leave_then_count_follows() {
        let registry = SessionRegistry::new();
        registry.create(settings("a", true)).await.expect("create");

        registry.register_connection("a").await;
        registry.register_connection("a").await;
        let after_leave = registry.register_disconnect("a").await;

        assert_eq!(after_leave, Some(1));
        assert_eq!(
            registry.get("a").await.map(|s| s.descriptor.current_players),
            Some(1)
        );
        assert_eq!(registry.register_connection("missing").await, None);
    }

    #[tokio::test]
    async fn when_destroyed_then_session_is_gone() {
        let registry = SessionRegistry::new();
        registry.create(settings("a", true)).await.expect("create");

        assert_eq!(registry.destroy("a").await, Ok(()));
        assert_eq!(registry.destroy("a").await, Err(RegistryError::NotFound));
        assert!(registry.list(ALL).await.is_empty());
    }
}
