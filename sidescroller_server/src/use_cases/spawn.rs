// Authoritative swap from a placeholder pawn to a chosen player entity.

use crate::domain::tuning::player::PlayerTuning;
use crate::domain::{
    CharacterArchetype, CharacterSelectionLedger, ConnectionId, FlowError, PawnId, PlayerEntity,
    PlayerRoster, World,
};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub connection_id: ConnectionId,
    pub archetype: Option<CharacterArchetype>,
    pub label: String,
    /// Whether the archetype is a choice made by the connection (and belongs
    /// in the ledger) rather than a server default.
    pub persist_selection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOutcome {
    pub new_pawn: PawnId,
    pub replaced: PawnId,
}

/// Replaces the connection's current pawn with a freshly spawned player entity.
///
/// On any rejection the connection keeps its current pawn and nothing else
/// changes. On success the connection possesses exactly the new pawn and the
/// old one no longer exists.
pub fn spawn_player(
    world: &mut World,
    ledger: &mut CharacterSelectionLedger,
    roster: &mut PlayerRoster,
    tuning: &PlayerTuning,
    request: SpawnRequest,
) -> Result<SpawnOutcome, FlowError> {
    let connection_id = request.connection_id;
    let archetype = request.archetype.ok_or(FlowError::MissingArchetype)?;
    if world.controller(connection_id).is_none() {
        return Err(FlowError::MissingController { connection_id });
    }
    let (old_pawn, location, rotation) = world
        .possessed_pawn(connection_id)
        .map(|pawn| (pawn.id, pawn.location, pawn.rotation))
        .ok_or(FlowError::MissingPawn { connection_id })?;

    if request.persist_selection {
        if let Some(previous) = ledger.record(connection_id, archetype) {
            debug!(connection_id, ?previous, ?archetype, "character selection replaced");
        }
    }

    let drop_in = location + tuning.drop_in_height;
    let label = if request.label.trim().is_empty() {
        archetype.label().to_string()
    } else {
        request.label
    };
    let player = PlayerEntity::new(connection_id, archetype, label, drop_in, tuning);
    let new_pawn = world.spawn_player(drop_in, rotation, player);

    // Swap possession before the old pawn goes away.
    world.unpossess(connection_id);
    world.possess(connection_id, new_pawn);
    if let Some(controller) = world.controller_mut(connection_id) {
        controller.has_chosen_character = true;
    }

    let replaced_player = world
        .destroy_pawn(old_pawn)
        .is_some_and(|pawn| pawn.as_player().is_some());
    if replaced_player && roster.contains(old_pawn) {
        roster.remove(old_pawn);
    }
    roster.add(new_pawn);

    info!(connection_id, new_pawn, old_pawn, ?archetype, "player spawned");
    Ok(SpawnOutcome {
        new_pawn,
        replaced: old_pawn,
    })
}
