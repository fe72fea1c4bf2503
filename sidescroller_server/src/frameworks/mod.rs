// Frameworks: runtime bootstrap, env config and on-disk data.

pub mod config;
pub mod levels;
pub mod save_game;
pub mod server;
