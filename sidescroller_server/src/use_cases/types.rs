// Use-case level inputs/outputs for the world task.

use crate::domain::{CharacterArchetype, Collectible, ConnectionId, PawnId, PlayerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPhase {
    Begin,
    End,
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        connection_id: ConnectionId,
        display_name: String,
    },
    Leave {
        connection_id: ConnectionId,
    },
    SpawnPlayer {
        connection_id: ConnectionId,
        archetype: Option<CharacterArchetype>,
        label: String,
    },
    CheckGameStartReqs {
        connection_id: ConnectionId,
    },
    StartLevel {
        connection_id: ConnectionId,
    },
    TravelToLevel {
        connection_id: ConnectionId,
    },
    Restart {
        connection_id: ConnectionId,
    },
    Damage {
        connection_id: ConnectionId,
        amount: f32,
    },
    Overlap {
        connection_id: ConnectionId,
        trigger_id: String,
        phase: OverlapPhase,
    },
    Interact {
        connection_id: ConnectionId,
        door_id: String,
    },
    Respawn {
        connection_id: ConnectionId,
    },
    Collect {
        connection_id: ConnectionId,
        item: Collectible,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Join { .. } => "join",
            GameEvent::Leave { .. } => "leave",
            GameEvent::SpawnPlayer { .. } => "spawn_player",
            GameEvent::CheckGameStartReqs { .. } => "check_game_start_reqs",
            GameEvent::StartLevel { .. } => "start_level",
            GameEvent::TravelToLevel { .. } => "travel_to_level",
            GameEvent::Restart { .. } => "restart",
            GameEvent::Damage { .. } => "damage",
            GameEvent::Overlap { .. } => "overlap",
            GameEvent::Interact { .. } => "interact",
            GameEvent::Respawn { .. } => "respawn",
            GameEvent::Collect { .. } => "collect",
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        match self {
            GameEvent::Join { connection_id, .. }
            | GameEvent::Leave { connection_id }
            | GameEvent::SpawnPlayer { connection_id, .. }
            | GameEvent::CheckGameStartReqs { connection_id }
            | GameEvent::StartLevel { connection_id }
            | GameEvent::TravelToLevel { connection_id }
            | GameEvent::Restart { connection_id }
            | GameEvent::Damage { connection_id, .. }
            | GameEvent::Overlap { connection_id, .. }
            | GameEvent::Interact { connection_id, .. }
            | GameEvent::Respawn { connection_id }
            | GameEvent::Collect { connection_id, .. } => *connection_id,
        }
    }

    /// Session and level flow requests. These wait for room in the input
    /// channel; per-frame gameplay signals may be dropped under load.
    pub fn is_flow_request(&self) -> bool {
        !matches!(
            self,
            GameEvent::Damage { .. } | GameEvent::Overlap { .. } | GameEvent::Collect { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
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

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
}

/// Something clients (UI, audio) should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeKind {
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

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNotice {
    /// `None` addresses every connection.
    pub target: Option<ConnectionId>,
    pub kind: NoticeKind,
}

impl FlowNotice {
    pub fn broadcast(kind: NoticeKind) -> Self {
        Self { target: None, kind }
    }

    pub fn to(connection_id: ConnectionId, kind: NoticeKind) -> Self {
        Self {
            target: Some(connection_id),
            kind,
        }
    }

    pub fn is_for(&self, connection_id: ConnectionId) -> bool {
        self.target.is_none_or(|target| target == connection_id)
    }
}

/// Delayed actions scheduled on the authority's timer queue.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowTimer {
    EnableRespawn { connection_id: ConnectionId },
    Teleport { trigger_id: String, pawn_id: PawnId },
    DeathCleanup { pawn_id: PawnId },
    LevelComplete,
    CharacterSelectPrompt { connection_id: ConnectionId },
}

/// Why the world task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldExit {
    Shutdown,
    /// No players remain and the game-over map cannot be reached.
    HardQuit,
}
