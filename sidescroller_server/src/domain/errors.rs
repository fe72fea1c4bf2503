// Domain-level errors for level-flow operations.

use crate::domain::state::{ConnectionId, PawnId};
use std::fmt;

/// Reasons a flow operation declined to run. Every variant leaves the session
/// state untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowError {
    MissingController { connection_id: ConnectionId },
    MissingPawn { connection_id: ConnectionId },
    MissingPlayer { pawn_id: PawnId },
    MissingArchetype,
    MissingDoor { door_id: String },
    UnknownTrigger { trigger_id: String },
    WrongMap { expected: &'static str },
    UnresolvedMap,
    ThresholdNotMet { connected: u32, required: u32 },
    SelectionsPending { pending: usize },
    NotReady,
    RespawnLocked,
    RespawnMenuClosed,
    AlreadySpawned { connection_id: ConnectionId },
    Eliminated { connection_id: ConnectionId },
}

impl FlowError {
    /// Declines caused by the caller asking too early, as opposed to a missing
    /// collaborator. Logged at a lower level.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FlowError::ThresholdNotMet { .. }
                | FlowError::SelectionsPending { .. }
                | FlowError::NotReady
                | FlowError::RespawnLocked
                | FlowError::RespawnMenuClosed
                | FlowError::WrongMap { .. }
                | FlowError::MissingArchetype
                | FlowError::AlreadySpawned { .. }
                | FlowError::Eliminated { .. }
        )
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::MissingController { connection_id } => {
                write!(f, "no controller for connection {connection_id}")
            }
            FlowError::MissingPawn { connection_id } => {
                write!(f, "connection {connection_id} has no possessed pawn")
            }
            FlowError::MissingPlayer { pawn_id } => {
                write!(f, "pawn {pawn_id} is not a player entity")
            }
            FlowError::MissingArchetype => write!(f, "no character archetype given"),
            FlowError::MissingDoor { door_id } => write!(f, "door {door_id:?} not found"),
            FlowError::UnknownTrigger { trigger_id } => {
                write!(f, "trigger {trigger_id:?} not found on this map")
            }
            FlowError::WrongMap { expected } => write!(f, "current map is not a {expected}"),
            FlowError::UnresolvedMap => write!(f, "map path could not be resolved"),
            FlowError::ThresholdNotMet {
                connected,
                required,
            } => write!(f, "{connected} of {required} required players connected"),
            FlowError::SelectionsPending { pending } => {
                write!(f, "{pending} players have not chosen a character")
            }
            FlowError::NotReady => write!(f, "game start requirements not met"),
            FlowError::RespawnLocked => write!(f, "respawn is still disabled"),
            FlowError::RespawnMenuClosed => write!(f, "no respawn menu is open"),
            FlowError::AlreadySpawned { connection_id } => write!(
                f,
                "connection {connection_id} already has a player in this level"
            ),
            FlowError::Eliminated { connection_id } => {
                write!(f, "connection {connection_id} is out of lives for this level")
            }
        }
    }
}
