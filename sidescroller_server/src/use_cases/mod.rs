// Use cases layer: application workflows for the session authority.

pub mod authority;
pub mod checkpoint;
pub mod game;
pub mod level;
pub mod lobby;
pub mod registry;
pub mod session;
pub mod spawn;
pub mod types;

pub use authority::{Authority, AuthoritySettings};
pub use registry::{RegistryError, SessionRegistry};
pub use session::{SessionDirectory, SessionError};
pub use types::{FlowNotice, GameEvent, NoticeKind, ServerState, WorldExit, WorldUpdate};
