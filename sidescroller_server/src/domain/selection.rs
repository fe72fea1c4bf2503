// Per-connection record of chosen character archetypes.

use crate::domain::state::{CharacterArchetype, ConnectionId};
use std::collections::HashMap;

/// Maps each connection to at most one archetype. Entries are written only by
/// the connection's own selection request, outlive level travel and are
/// dropped when the connection leaves.
#[derive(Debug, Default, Clone)]
pub struct CharacterSelectionLedger {
    entries: HashMap<ConnectionId, CharacterArchetype>,
}

impl CharacterSelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the selection, overwriting any previous choice. Returns the
    /// replaced archetype, if there was one.
    pub fn record(
        &mut self,
        connection_id: ConnectionId,
        archetype: CharacterArchetype,
    ) -> Option<CharacterArchetype> {
        self.entries.insert(connection_id, archetype)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<CharacterArchetype> {
        self.entries.get(&connection_id).copied()
    }

    pub fn has_selection(&self, connection_id: ConnectionId) -> bool {
        self.entries.contains_key(&connection_id)
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<CharacterArchetype> {
        self.entries.remove(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
