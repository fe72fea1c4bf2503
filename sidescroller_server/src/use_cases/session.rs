// Online session directory: host, search and join.

use crate::domain::SessionDescriptor;
use crate::domain::ports::{
    BackendError, OnlineBackend, SessionQuery, SessionSearchResult, SessionSettings,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

/// Upper bound on the number of sessions a single search returns.
pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No online backend is configured; hosting cannot proceed.
    NoBackend,
    Backend(BackendError),
    SearchInvalidated,
    IndexOutOfRange { index: usize, len: usize },
    InvalidAddress,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoBackend => write!(f, "no online backend available"),
            SessionError::Backend(err) => write!(f, "online backend error: {err:?}"),
            SessionError::SearchInvalidated => write!(f, "session search was invalidated"),
            SessionError::IndexOutOfRange { index, len } => {
                write!(f, "session index {index} out of range ({len} results)")
            }
            SessionError::InvalidAddress => write!(f, "invalid session address"),
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::SearchInvalidated => SessionError::SearchInvalidated,
            other => SessionError::Backend(other),
        }
    }
}

/// Where a client should travel to join a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    pub server_name: Option<String>,
    pub travel_url: String,
}

pub struct SessionDirectory {
    backend: Option<Arc<dyn OnlineBackend>>,
    // Serializes create (and its destroy-first step).
    create_lock: Mutex<()>,
    // Latest search results; index joins read from here.
    last_search: RwLock<Vec<SessionSearchResult>>,
}

impl SessionDirectory {
    pub fn new(backend: Option<Arc<dyn OnlineBackend>>) -> Self {
        Self {
            backend,
            create_lock: Mutex::new(()),
            last_search: RwLock::new(Vec::new()),
        }
    }

    fn backend(&self) -> Result<&Arc<dyn OnlineBackend>, SessionError> {
        self.backend.as_ref().ok_or_else(|| {
            error!("no online backend; cannot use sessions");
            SessionError::NoBackend
        })
    }

    /// Creates the session, destroying a same-named one first.
    pub async fn create_session(&self, settings: SessionSettings) -> Result<(), SessionError> {
        let backend = self.backend()?;
        let _guard = self.create_lock.lock().await;

        if backend.session_exists(&settings.server_name).await? {
            info!(
                server_name = %settings.server_name,
                "session exists; destroying before re-create"
            );
            match backend.destroy_session(&settings.server_name).await {
                Ok(()) | Err(BackendError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let server_name = settings.server_name.clone();
        backend
            .create_session(settings)
            .await
            .inspect_err(|err| warn!(%server_name, error = ?err, "failed to create session"))?;
        info!(%server_name, "session created");
        Ok(())
    }

    /// Presence-scoped search. The results replace the previous snapshot.
    pub async fn find_sessions(&self) -> Result<Vec<SessionDescriptor>, SessionError> {
        let backend = self.backend()?;
        let mut results = backend
            .find_sessions(SessionQuery {
                presence: true,
                max_results: MAX_SEARCH_RESULTS,
            })
            .await
            .inspect_err(|err| warn!(error = ?err, "session search failed"))?;
        results.truncate(MAX_SEARCH_RESULTS);

        let descriptors = results
            .iter()
            .map(|result| result.descriptor.clone())
            .collect::<Vec<_>>();
        info!(found = descriptors.len(), "session search complete");
        *self.last_search.write().await = results;
        Ok(descriptors)
    }

    /// Joins by position in the latest search. There is no guard against a
    /// newer search having replaced the list the caller indexed into.
    pub async fn join_by_index(&self, index: usize) -> Result<JoinTarget, SessionError> {
        let results = self.last_search.read().await;
        let result = results.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: results.len(),
        })?;
        Ok(JoinTarget {
            server_name: Some(result.descriptor.server_name.clone()),
            travel_url: travel_url(&result.connect_address)?,
        })
    }

    pub async fn join_by_address(&self, address: &str) -> Result<JoinTarget, SessionError> {
        Ok(JoinTarget {
            server_name: None,
            travel_url: travel_url(address)?,
        })
    }
}

/// Turns `host:port` (or a full URL) into the WebSocket URL clients connect to.
fn travel_url(address: &str) -> Result<String, SessionError> {
    let address = address.trim();
    if address.is_empty() || address.contains(char::is_whitespace) {
        return Err(SessionError::InvalidAddress);
    }
    if address.starts_with("ws://") || address.starts_with("wss://") {
        return Ok(address.to_string());
    }
    let host = address
        .strip_prefix("http://")
        .unwrap_or(address)
        .trim_end_matches('/');
    Ok(format!("ws://{host}/ws"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeBackend {
        sessions: StdMutex<Vec<SessionSearchResult>>,
        calls: StdMutex<Vec<String>>,
        invalidate_search: bool,
    }

    impl FakeBackend {
        fn with_sessions(names: &[&str]) -> Self {
            let backend = FakeBackend::default();
            {
                let mut sessions = backend.sessions.lock().expect("sessions mutex poisoned");
                for name in names {
                    sessions.push(SessionSearchResult {
                        descriptor: SessionDescriptor {
                            server_name: name.to_string(),
                            host_user_name: "Host".to_string(),
                            current_players: 1,
                            max_players: 4,
                        },
                        connect_address: format!("{name}.local:3001"),
                    });
                }
            }
            backend
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls mutex poisoned").clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().expect("calls mutex poisoned").push(call);
        }
    }

    #[async_trait]
    impl OnlineBackend for FakeBackend {
        async fn create_session(&self, settings: SessionSettings) -> Result<(), BackendError> {
            self.record(format!("create:{}", settings.server_name));
            Ok(())
        }

        async fn destroy_session(&self, server_name: &str) -> Result<(), BackendError> {
            self.record(format!("destroy:{server_name}"));
            Ok(())
        }

        async fn session_exists(&self, server_name: &str) -> Result<bool, BackendError> {
            let sessions = self.sessions.lock().expect("sessions mutex poisoned");
            Ok(sessions
                .iter()
                .any(|s| s.descriptor.server_name == server_name))
        }

        async fn find_sessions(
            &self,
            query: SessionQuery,
        ) -> Result<Vec<SessionSearchResult>, BackendError> {
            if self.invalidate_search {
                return Err(BackendError::SearchInvalidated);
            }
            let sessions = self.sessions.lock().expect("sessions mutex poisoned");
            Ok(sessions.iter().take(query.max_results).cloned().collect())
        }
    }

    fn settings(name: &str) -> SessionSettings {
        SessionSettings {
            server_name: name.to_string(),
            host_user_name: "Host".to_string(),
            max_players: 4,
            connect_address: "127.0.0.1:3001".to_string(),
            presence: true,
        }
    }

    #[tokio::test]
    async fn when_session_name_exists_then_it_is_destroyed_before_create() {
        let backend = Arc::new(FakeBackend::with_sessions(&["castle"]));
        let directory = SessionDirectory::new(Some(backend.clone() as Arc<dyn OnlineBackend>));

        directory
            .create_session(settings("castle"))
            .await
            .expect("create should succeed");

        assert_eq!(backend.calls(), vec!["destroy:castle", "create:castle"]);
    }

    #[tokio::test]
    async fn when_no_backend_then_create_fails() {
        let directory = SessionDirectory::new(None);

        let result = directory.create_session(settings("castle")).await;

        assert_eq!(result, Err(SessionError::NoBackend));
    }

    #[tokio::test]
    async fn when_search_finds_nothing_then_result_is_empty() {
        let directory = SessionDirectory::new(Some(Arc::new(FakeBackend::default())));

        let found = directory.find_sessions().await.expect("empty search is ok");

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn when_search_is_invalidated_then_caller_gets_an_error() {
        let backend = FakeBackend {
            invalidate_search: true,
            ..FakeBackend::default()
        };
        let directory = SessionDirectory::new(Some(Arc::new(backend)));

        let result = directory.find_sessions().await;

        assert_eq!(result, Err(SessionError::SearchInvalidated));
    }

    #[tokio::test]
    async fn when_joining_by_index_then_latest_snapshot_address_is_used() {
        let backend = FakeBackend::with_sessions(&["alpha", "beta"]);
        let directory = SessionDirectory::new(Some(Arc::new(backend)));
        directory.find_sessions().await.expect("search");

        let target = directory.join_by_index(1).await.expect("join");

        assert_eq!(target.server_name.as_deref(), Some("beta"));
        assert_eq!(target.travel_url, "ws://beta.local:3001/ws");
    }

    #[tokio::test]
    async fn when_index_is_past_snapshot_then_join_fails_without_panicking() {
        let directory = SessionDirectory::new(Some(Arc::new(FakeBackend::default())));

        let result = directory.join_by_index(3).await;

        assert_eq!(
            result,
            Err(SessionError::IndexOutOfRange { index: 3, len: 0 })
        );
    }

    #[tokio::test]
    async fn when_joining_by_blank_address_then_join_fails() {
        let directory = SessionDirectory::new(None);

        assert_eq!(
            directory.join_by_address("  ").await,
            Err(SessionError::InvalidAddress)
        );
        assert_eq!(
            directory
                .join_by_address("http://10.0.0.2:3001/")
                .await
                .map(|t| t.travel_url),
            Ok("ws://10.0.0.2:3001/ws".to_string())
        );
    }
}
