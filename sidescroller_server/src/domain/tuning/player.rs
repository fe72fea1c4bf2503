use crate::domain::state::Vec2;

/// Gameplay tuning for player entities.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Health a freshly spawned or revived player starts with.
    pub max_health: f32,

    /// Lives granted when a player entity is spawned.
    pub starting_lives: u32,

    /// Offset above the replaced pawn where a chosen character drops in.
    pub drop_in_height: Vec2,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            starting_lives: 3,
            drop_in_height: Vec2::new(0.0, 50.0),
        }
    }
}
