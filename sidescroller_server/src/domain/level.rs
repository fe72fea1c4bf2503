// Level progression state and the catalog of maps the server can travel to.

use crate::domain::state::Vec2;
use serde::Deserialize;

/// Process-wide progression owned by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelState {
    /// 1-based index of the level to play next (or being played).
    pub current_level: u32,
    pub ready_to_start: bool,
    pub min_players_to_start: u32,
}

impl LevelState {
    pub fn new(min_players_to_start: u32) -> Self {
        Self {
            current_level: 1,
            ready_to_start: false,
            min_players_to_start,
        }
    }
}

/// The kind of map the session is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Lobby,
    Level(u32),
    GameOver,
    Credits,
}

impl MapKind {
    /// Terminal menu maps where the empty-roster check must not run.
    pub fn is_menu(self) -> bool {
        matches!(self, MapKind::GameOver | MapKind::Credits)
    }

    /// Whether per-tick game-over detection applies on this map.
    pub fn watches_roster(self) -> bool {
        matches!(self, MapKind::Level(_))
    }

    pub fn name(self) -> &'static str {
        match self {
            MapKind::Lobby => "lobby",
            MapKind::Level(_) => "level",
            MapKind::GameOver => "game_over",
            MapKind::Credits => "credits",
        }
    }
}

/// A resolved server travel target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelRequest {
    pub map: MapKind,
    /// Map path without options, e.g. `/Maps/Map_Level1`.
    pub map_path: String,
    /// Full travel URL including the listen option.
    pub url: String,
    pub seamless: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub location: Vec2,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DoorLayout {
    pub id: String,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeleportLayout {
    pub id: String,
    pub door_id: String,
    pub target: Vec2,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerLayout {
    pub id: String,
}

/// Static placement of the triggers and doors of one map.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    pub spawn_point: Vec2,
    pub checkpoints: Vec<Checkpoint>,
    pub fall_off_triggers: Vec<TriggerLayout>,
    pub doors: Vec<DoorLayout>,
    pub teleports: Vec<TeleportLayout>,
    pub level_complete_triggers: Vec<TriggerLayout>,
}

/// Maps the server knows how to travel to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelCatalog {
    pub lobby_map: String,
    pub level_map_prefix: String,
    /// `None` leaves the empty-roster route unresolvable (hard quit).
    pub game_over_map: Option<String>,
    pub credits_map: Option<String>,
    pub lobby: LevelLayout,
    pub levels: Vec<LevelLayout>,
}

const LISTEN_OPTION: &str = "?listen";

impl Default for LevelCatalog {
    fn default() -> Self {
        Self {
            lobby_map: "/Maps/Map_Lobby".to_string(),
            level_map_prefix: "/Maps/Map_Level".to_string(),
            game_over_map: Some("/Maps/Map_GameOverMenu".to_string()),
            credits_map: Some("/Maps/Map_Credits".to_string()),
            lobby: LevelLayout::default(),
            levels: vec![LevelLayout::default()],
        }
    }
}

impl LevelCatalog {
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn has_level(&self, index: u32) -> bool {
        index >= 1 && index <= self.level_count()
    }

    /// Map path for a map kind, or `None` if the catalog cannot route there.
    pub fn resolve(&self, map: MapKind) -> Option<String> {
        match map {
            MapKind::Lobby => Some(self.lobby_map.clone()),
            MapKind::Level(index) if self.has_level(index) => {
                Some(format!("{}{}", self.level_map_prefix, index))
            }
            MapKind::Level(_) => None,
            MapKind::GameOver => self.game_over_map.clone().filter(|path| !path.is_empty()),
            MapKind::Credits => self.credits_map.clone().filter(|path| !path.is_empty()),
        }
    }

    pub fn travel_to(&self, map: MapKind) -> Option<TravelRequest> {
        let map_path = self.resolve(map)?;
        Some(TravelRequest {
            map,
            url: format!("{map_path}{LISTEN_OPTION}"),
            map_path,
            seamless: true,
        })
    }

    /// Layout for the given map; menu maps have an empty layout.
    pub fn layout(&self, map: MapKind) -> LevelLayout {
        match map {
            MapKind::Lobby => self.lobby.clone(),
            MapKind::Level(index) if self.has_level(index) => {
                self.levels[(index - 1) as usize].clone()
            }
            _ => LevelLayout::default(),
        }
    }
}
