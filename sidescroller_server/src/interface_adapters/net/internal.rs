use crate::domain::SessionDescriptor;
use crate::domain::ports::{SessionQuery, SessionSettings};
use crate::interface_adapters::http::{CreateSessionRequest, ErrorResponse, SessionEntryDto};
use crate::interface_adapters::state::AppState;
use crate::use_cases::session::{JoinTarget, MAX_SEARCH_RESULTS};
use crate::use_cases::{RegistryError, SessionError};

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
struct CreateSessionResponse {
    // The session name that was registered.
    server_name: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    presence: bool,
    max_results: Option<usize>,
}

fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let server_name = payload.server_name.trim().to_string();
    if server_name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "server_name is required");
    }
    if payload.connect_address.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "connect_address is required");
    }

    let mut settings: SessionSettings = payload.into();
    settings.server_name = server_name.clone();

    match state.registry.create(settings).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(CreateSessionResponse { server_name }),
        )
            .into_response(),
        Err(RegistryError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "session already exists")
        }
        Err(RegistryError::NotFound) => error_response(StatusCode::NOT_FOUND, "session not found"),
    }
}

pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSessionsQuery>,
) -> impl IntoResponse {
    let max_results = query
        .max_results
        .unwrap_or(MAX_SEARCH_RESULTS)
        .min(MAX_SEARCH_RESULTS);
    let sessions: Vec<SessionEntryDto> = state
        .registry
        .list(SessionQuery {
            presence: query.presence,
            max_results,
        })
        .await
        .into_iter()
        .map(SessionEntryDto::from)
        .collect();
    (StatusCode::OK, Json(sessions)).into_response()
}

pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Path(server_name): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&server_name).await {
        Some(session) => (StatusCode::OK, Json(SessionEntryDto::from(session))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "session not found"),
    }
}

pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(server_name): Path<String>,
) -> impl IntoResponse {
    match state.registry.destroy(&server_name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "session not found"),
    }
}

// Directory routes run the host-side search/join flow through the configured backend.

#[derive(Debug, serde::Serialize)]
struct SearchResponse {
    sessions: Vec<SessionDescriptor>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JoinRequest {
    index: Option<usize>,
    address: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct JoinResponse {
    server_name: Option<String>,
    travel_url: String,
}

impl From<JoinTarget> for JoinResponse {
    fn from(target: JoinTarget) -> Self {
        JoinResponse {
            server_name: target.server_name,
            travel_url: target.travel_url,
        }
    }
}

fn session_error_response(err: SessionError) -> axum::response::Response {
    let status = match err {
        SessionError::NoBackend => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Backend(_) => StatusCode::BAD_GATEWAY,
        SessionError::SearchInvalidated => StatusCode::CONFLICT,
        SessionError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        SessionError::InvalidAddress => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

pub async fn directory_search_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.directory.find_sessions().await {
        Ok(sessions) => (StatusCode::OK, Json(SearchResponse { sessions })).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub async fn directory_join_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JoinRequest>,
) -> impl IntoResponse {
    let result = match (payload.index, payload.address) {
        (Some(index), None) => state.directory.join_by_index(index).await,
        (None, Some(address)) => state.directory.join_by_address(&address).await,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "exactly one of index or address is required",
            );
        }
    };

    match result {
        Ok(target) => (StatusCode::OK, Json(JoinResponse::from(target))).into_response(),
        Err(err) => session_error_response(err),
    }
}
