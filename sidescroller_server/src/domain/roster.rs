// Authoritative roster of live player entities for the current level.

use crate::domain::state::PawnId;
use tracing::warn;

/// Ordered set of player pawns that are still in play.
#[derive(Debug, Default, Clone)]
pub struct PlayerRoster {
    members: Vec<PawnId>,
}

impl PlayerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player; returns false when it was already a member.
    pub fn add(&mut self, pawn_id: PawnId) -> bool {
        if self.members.contains(&pawn_id) {
            return false;
        }
        self.members.push(pawn_id);
        true
    }

    /// Removes a player. Removing a non-member warns and changes nothing.
    pub fn remove(&mut self, pawn_id: PawnId) -> bool {
        match self.members.iter().position(|member| *member == pawn_id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => {
                warn!(pawn_id, "player not in roster; not removing");
                false
            }
        }
    }

    pub fn contains(&self, pawn_id: PawnId) -> bool {
        self.members.contains(&pawn_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PawnId> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}
