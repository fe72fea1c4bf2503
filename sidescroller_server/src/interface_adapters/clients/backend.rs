use crate::domain::ports::{
    BackendError, OnlineBackend, SessionQuery, SessionSearchResult, SessionSettings,
};
use crate::interface_adapters::http::{CreateSessionRequest, SessionEntryDto};

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

// Thin reqwest client for a remote session directory exposing the /sessions routes.
#[derive(Clone)]
pub struct HttpSessionBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSessionBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self, server_name: &str) -> String {
        format!("{}/sessions/{}", self.base_url, server_name)
    }
}

#[async_trait]
impl OnlineBackend for HttpSessionBackend {
    async fn create_session(&self, settings: SessionSettings) -> Result<(), BackendError> {
        let url = format!("{}/sessions", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&CreateSessionRequest::from(&settings))
            .send()
            .await
            .map_err(|_| BackendError::Unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(BackendError::AlreadyExists),
            status => {
                debug!(%status, "session create rejected");
                Err(BackendError::Unavailable)
            }
        }
    }

    async fn destroy_session(&self, server_name: &str) -> Result<(), BackendError> {
        let response = self
            .http
            .delete(self.session_url(server_name))
            .send()
            .await
            .map_err(|_| BackendError::Unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound),
            _ => Err(BackendError::Unavailable),
        }
    }

    async fn session_exists(&self, server_name: &str) -> Result<bool, BackendError> {
        let response = self
            .http
            .get(self.session_url(server_name))
            .send()
            .await
            .map_err(|_| BackendError::Unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(BackendError::Unavailable),
        }
    }

    async fn find_sessions(
        &self,
        query: SessionQuery,
    ) -> Result<Vec<SessionSearchResult>, BackendError> {
        let url = format!(
            "{}/sessions?presence={}&max_results={}",
            self.base_url, query.presence, query.max_results
        );
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|_| BackendError::Unavailable)?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable);
        }

        // A body that does not decode means the search did not complete.
        let entries = response
            .json::<Vec<SessionEntryDto>>()
            .await
            .map_err(|_| BackendError::SearchInvalidated)?;
        Ok(entries.into_iter().map(SessionSearchResult::from).collect())
    }
}
