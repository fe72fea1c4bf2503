// Wire protocol DTOs and conversions for public game server messages.
// Session registry DTOs live in `http`.

use crate::domain::{CharacterArchetype, Collectible, ConnectionId, PlayerSnapshot};
use crate::use_cases::types::OverlapPhase;
use crate::use_cases::{FlowNotice, GameEvent, NoticeKind, ServerState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { connection_id: String },
    // Snapshot of the players for a given tick.
    WorldUpdate(WorldUpdateDto),
    // High-level flow state (lobby, level, menus).
    GameState(ServerStateDto),
    // One-off flow events addressed to this client or to everyone.
    Notice(NoticeDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message.
    Join(JoinPayload),
    SpawnPlayer(SpawnPlayerPayload),
    CheckGameStartReqs,
    StartLevel,
    TravelToLevel,
    Restart,
    Damage(DamagePayload),
    Overlap(OverlapPayload),
    Interact(InteractPayload),
    Respawn,
    Collect(Collectible),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnPlayerPayload {
    // Unknown or missing names reach the authority as "no archetype".
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DamagePayload {
    pub amount: f32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPhaseDto {
    #[default]
    Begin,
    End,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlapPayload {
    pub trigger_id: String,
    #[serde(default)]
    pub phase: OverlapPhaseDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractPayload {
    pub door_id: String,
}

impl From<OverlapPhaseDto> for OverlapPhase {
    fn from(phase: OverlapPhaseDto) -> Self {
        match phase {
            OverlapPhaseDto::Begin => OverlapPhase::Begin,
            OverlapPhaseDto::End => OverlapPhase::End,
        }
    }
}

/// Why a client message could not become a game event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRejection {
    // Join is only valid as the first message.
    DuplicateJoin,
    InvalidValue,
}

impl ClientMessage {
    /// Converts a post-handshake message into a game event for `connection_id`.
    pub fn into_event(self, connection_id: ConnectionId) -> Result<GameEvent, MessageRejection> {
        let event = match self {
            ClientMessage::Join(_) => return Err(MessageRejection::DuplicateJoin),
            ClientMessage::SpawnPlayer(payload) => GameEvent::SpawnPlayer {
                connection_id,
                archetype: payload
                    .archetype
                    .as_deref()
                    .and_then(CharacterArchetype::from_name),
                label: payload.label,
            },
            ClientMessage::CheckGameStartReqs => GameEvent::CheckGameStartReqs { connection_id },
            ClientMessage::StartLevel => GameEvent::StartLevel { connection_id },
            ClientMessage::TravelToLevel => GameEvent::TravelToLevel { connection_id },
            ClientMessage::Restart => GameEvent::Restart { connection_id },
            ClientMessage::Damage(payload) => {
                if !payload.amount.is_finite() || payload.amount < 0.0 {
                    return Err(MessageRejection::InvalidValue);
                }
                GameEvent::Damage {
                    connection_id,
                    amount: payload.amount,
                }
            }
            ClientMessage::Overlap(payload) => GameEvent::Overlap {
                connection_id,
                trigger_id: payload.trigger_id,
                phase: payload.phase.into(),
            },
            ClientMessage::Interact(payload) => GameEvent::Interact {
                connection_id,
                door_id: payload.door_id,
            },
            ClientMessage::Respawn => GameEvent::Respawn { connection_id },
            ClientMessage::Collect(item) => {
                if let Collectible::Mushroom { heal } = item {
                    if !heal.is_finite() || heal < 0.0 {
                        return Err(MessageRejection::InvalidValue);
                    }
                }
                GameEvent::Collect {
                    connection_id,
                    item,
                }
            }
        };
        Ok(event)
    }
}

/// Snapshot of the players sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub players: Vec<PlayerStateDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            players: update.players.iter().map(PlayerStateDto::from).collect(),
        }
    }
}

/// Flattened player state for wire transmission in world updates.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub pawn_id: String,
    pub archetype: Option<CharacterArchetype>,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub lives: u32,
    pub points: u32,
    pub gems: u32,
    pub cherries: u32,
    pub alive: bool,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.connection_id.to_string(),
            pawn_id: player.pawn_id.to_string(),
            archetype: player.archetype,
            x: player.x,
            y: player.y,
            health: player.health,
            lives: player.lives,
            points: player.points,
            gems: player.gems,
            cherries: player.cherries,
            alive: player.alive,
        }
    }
}

/// Server flow state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby {
        players: u32,
        required: u32,
        ready: bool,
    },
    Level {
        index: u32,
    },
    GameOver,
    Credits,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby {
                players,
                required,
                ready,
            } => ServerStateDto::Lobby {
                players,
                required,
                ready,
            },
            ServerState::Level { index } => ServerStateDto::Level { index },
            ServerState::GameOver => ServerStateDto::GameOver,
            ServerState::Credits => ServerStateDto::Credits,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeDto {
    Travel {
        map_path: String,
        url: String,
        seamless: bool,
    },
    SelectCharacter,
    RespawnMenuOpened { lives_left: u32 },
    RespawnEnabled,
    Revived { x: f32, y: f32 },
    OutOfLives,
    CheckpointReached { checkpoint_id: String },
    DoorToggled { door_id: String, open: bool },
    Teleported { x: f32, y: f32 },
    LevelComplete { index: u32 },
}

impl From<FlowNotice> for NoticeDto {
    fn from(notice: FlowNotice) -> Self {
        match notice.kind {
            NoticeKind::Travel {
                map_path,
                url,
                seamless,
            } => NoticeDto::Travel {
                map_path,
                url,
                seamless,
            },
            NoticeKind::SelectCharacter => NoticeDto::SelectCharacter,
            NoticeKind::RespawnMenuOpened { lives_left } => {
                NoticeDto::RespawnMenuOpened { lives_left }
            }
            NoticeKind::RespawnEnabled => NoticeDto::RespawnEnabled,
            NoticeKind::Revived { x, y } => NoticeDto::Revived { x, y },
            NoticeKind::OutOfLives => NoticeDto::OutOfLives,
            NoticeKind::CheckpointReached { checkpoint_id } => {
                NoticeDto::CheckpointReached { checkpoint_id }
            }
            NoticeKind::DoorToggled { door_id, open } => NoticeDto::DoorToggled { door_id, open },
            NoticeKind::Teleported { x, y } => NoticeDto::Teleported { x, y },
            NoticeKind::LevelComplete { index } => NoticeDto::LevelComplete { index },
        }
    }
}
