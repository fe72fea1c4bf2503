// Gameplay tuning, kept apart from runtime/server configuration.

pub mod flow;
pub mod player;
