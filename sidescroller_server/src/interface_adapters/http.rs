// Shared HTTP payloads for the session routes and the HTTP session backend.

use crate::domain::SessionDescriptor;
use crate::domain::ports::{SessionSearchResult, SessionSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn default_presence() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub server_name: String,
    #[serde(default)]
    pub host_user_name: String,
    pub max_players: u16,
    pub connect_address: String,
    #[serde(default = "default_presence")]
    pub presence: bool,
}

impl From<CreateSessionRequest> for SessionSettings {
    fn from(req: CreateSessionRequest) -> Self {
        SessionSettings {
            server_name: req.server_name,
            host_user_name: req.host_user_name,
            max_players: req.max_players,
            connect_address: req.connect_address,
            presence: req.presence,
        }
    }
}

impl From<&SessionSettings> for CreateSessionRequest {
    fn from(settings: &SessionSettings) -> Self {
        CreateSessionRequest {
            server_name: settings.server_name.clone(),
            host_user_name: settings.host_user_name.clone(),
            max_players: settings.max_players,
            connect_address: settings.connect_address.clone(),
            presence: settings.presence,
        }
    }
}

/// One advertised session as listed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntryDto {
    pub server_name: String,
    pub host_user_name: String,
    pub current_players: u16,
    pub max_players: u16,
    pub connect_address: String,
}

impl From<SessionSearchResult> for SessionEntryDto {
    fn from(result: SessionSearchResult) -> Self {
        SessionEntryDto {
            server_name: result.descriptor.server_name,
            host_user_name: result.descriptor.host_user_name,
            current_players: result.descriptor.current_players,
            max_players: result.descriptor.max_players,
            connect_address: result.connect_address,
        }
    }
}

impl From<SessionEntryDto> for SessionSearchResult {
    fn from(dto: SessionEntryDto) -> Self {
        SessionSearchResult {
            descriptor: SessionDescriptor {
                server_name: dto.server_name,
                host_user_name: dto.host_user_name,
                current_players: dto.current_players,
                max_players: dto.max_players,
            },
            connect_address: dto.connect_address,
        }
    }
}
