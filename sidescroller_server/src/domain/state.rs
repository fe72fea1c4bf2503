// Domain-level player entities, identities and snapshot types.

use crate::domain::tuning::player::PlayerTuning;
use serde::{Deserialize, Serialize};
use std::ops::Add;

pub type ConnectionId = u64;
pub type PawnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Selectable character skins. Each one maps to a distinct player class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterArchetype {
    Pink,
    Orange,
    Yellow,
    Green,
    Blue,
    Black,
}

impl CharacterArchetype {
    pub const ALL: [CharacterArchetype; 6] = [
        CharacterArchetype::Pink,
        CharacterArchetype::Orange,
        CharacterArchetype::Yellow,
        CharacterArchetype::Green,
        CharacterArchetype::Blue,
        CharacterArchetype::Black,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CharacterArchetype::Pink => "Pink",
            CharacterArchetype::Orange => "Orange",
            CharacterArchetype::Yellow => "Yellow",
            CharacterArchetype::Green => "Green",
            CharacterArchetype::Blue => "Blue",
            CharacterArchetype::Black => "Black",
        }
    }

    /// Looks up an archetype by its wire name; unknown names resolve to `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|archetype| archetype.label().eq_ignore_ascii_case(name.trim()))
    }
}

/// Result of applying damage to a player entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Health dropped but the player is still standing.
    Hurt { health: f32 },
    /// Health reached zero on this hit; the death path must run.
    Depleted,
    /// The player was already down; nothing changed.
    Ignored,
}

/// Result of the player death path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathOutcome {
    /// A life was spent; the player waits for a respawn confirmation.
    Downed { lives_left: u32 },
    /// No lives were left; the entity is finalized.
    OutOfLives,
}

/// Pickups a player can collect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Collectible {
    Gem { value: u32 },
    Cherries { count: u32 },
    ExtraLife,
    Mushroom { heal: f32 },
}

/// The authoritative in-world state of a connected player.
#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub connection_id: ConnectionId,
    pub archetype: CharacterArchetype,
    pub label: String,
    pub health: f32,
    pub max_health: f32,
    pub lives: u32,
    pub points: u32,
    pub gems: u32,
    pub cherries: u32,
    pub last_checkpoint: Vec2,
    pub alive: bool,
    pub out_of_lives: bool,
}

impl PlayerEntity {
    pub fn new(
        connection_id: ConnectionId,
        archetype: CharacterArchetype,
        label: impl Into<String>,
        spawn_location: Vec2,
        tuning: &PlayerTuning,
    ) -> Self {
        Self {
            connection_id,
            archetype,
            label: label.into(),
            health: tuning.max_health,
            max_health: tuning.max_health,
            lives: tuning.starting_lives,
            points: 0,
            gems: 0,
            cherries: 0,
            // Until a checkpoint fires, the spawn location is the recovery point.
            last_checkpoint: spawn_location,
            alive: true,
            out_of_lives: false,
        }
    }

    pub fn add_health(&mut self, amount: f32) {
        self.health = (self.health + amount).clamp(0.0, self.max_health);
    }

    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome::Ignored;
        }

        self.add_health(-amount.max(0.0));
        if self.health <= 0.0 {
            DamageOutcome::Depleted
        } else {
            DamageOutcome::Hurt {
                health: self.health,
            }
        }
    }

    /// Spends a life if one is left, otherwise marks the entity out of lives.
    ///
    /// Returns `None` when the entity is already down, so the death path cannot
    /// run twice for the same death.
    pub fn player_death(&mut self) -> Option<DeathOutcome> {
        if !self.alive {
            return None;
        }

        self.alive = false;
        self.health = 0.0;
        if self.lives > 0 {
            self.lives -= 1;
            Some(DeathOutcome::Downed {
                lives_left: self.lives,
            })
        } else {
            self.out_of_lives = true;
            Some(DeathOutcome::OutOfLives)
        }
    }

    /// Restores full health and returns the location the pawn must move to.
    pub fn revive_at_checkpoint(&mut self) -> Vec2 {
        self.health = self.max_health;
        self.alive = true;
        self.last_checkpoint
    }

    pub fn collect(&mut self, item: Collectible) {
        match item {
            Collectible::Gem { value } => {
                self.gems = self.gems.saturating_add(value);
                self.points = self.points.saturating_add(value);
            }
            Collectible::Cherries { count } => {
                self.cherries = self.cherries.saturating_add(count);
            }
            Collectible::ExtraLife => self.lives = self.lives.saturating_add(1),
            // Pickups only ever heal; damage goes through the death path.
            Collectible::Mushroom { heal } => self.add_health(heal.max(0.0)),
        }
    }
}

/// Discoverable session metadata returned by a session search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub server_name: String,
    pub host_user_name: String,
    pub current_players: u16,
    pub max_players: u16,
}

/// Persisted profile and settings for the local player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub player_name: String,
    pub volume_level: f32,
    pub resolution_index: i32,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            player_name: "Default".to_string(),
            volume_level: 0.75,
            resolution_index: 1,
        }
    }
}

impl SaveData {
    /// Clamps values that came from disk into their valid ranges.
    pub fn sanitized(mut self) -> Self {
        if !self.volume_level.is_finite() {
            self.volume_level = SaveData::default().volume_level;
        }
        self.volume_level = self.volume_level.clamp(0.0, 1.0);
        if self.player_name.trim().is_empty() {
            self.player_name = SaveData::default().player_name;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub connection_id: ConnectionId,
    pub pawn_id: PawnId,
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
