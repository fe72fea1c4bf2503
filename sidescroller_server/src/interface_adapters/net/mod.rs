// Network adapter modules split by player sockets vs internal session HTTP routes.

pub mod client;
pub mod internal;

pub use client::{world_update_serializer, ws_handler};
pub use internal::{
    create_session_handler, delete_session_handler, directory_join_handler,
    directory_search_handler, get_session_handler, list_sessions_handler,
};
