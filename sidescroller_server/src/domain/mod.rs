// Domain layer: pure session and level state, free of networking.

pub mod errors;
pub mod level;
pub mod ports;
pub mod roster;
pub mod selection;
pub mod state;
pub mod timers;
pub mod tuning;
pub mod world;

pub use errors::FlowError;
pub use level::{LevelCatalog, LevelLayout, LevelState, MapKind, TravelRequest};
pub use roster::PlayerRoster;
pub use selection::CharacterSelectionLedger;
pub use state::{
    CharacterArchetype, Collectible, ConnectionId, PawnId, PlayerEntity, PlayerSnapshot, SaveData,
    SessionDescriptor, Vec2,
};
pub use timers::{TimerHandle, TimerQueue};
pub use world::World;
