// Checkpoints, hazards, doors, teleports and the respawn flow.

use crate::domain::level::{Checkpoint, DoorLayout, TeleportLayout};
use crate::domain::state::DeathOutcome;
use crate::domain::{
    ConnectionId, FlowError, PawnId, PlayerRoster, TimerHandle, TimerQueue, Vec2, World,
};
use crate::use_cases::types::FlowTimer;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One-shot checkpoint. The first player to touch it moves the recovery point
/// of the whole roster.
#[derive(Debug, Clone)]
pub struct CheckpointTrigger {
    pub id: String,
    pub location: Vec2,
    has_given_feedback: bool,
}

impl CheckpointTrigger {
    pub fn new(layout: &Checkpoint) -> Self {
        Self {
            id: layout.id.clone(),
            location: layout.location,
            has_given_feedback: false,
        }
    }

    /// Returns false when the checkpoint had already fired.
    pub fn on_player_overlap(&mut self, world: &mut World, roster: &PlayerRoster) -> bool {
        if self.has_given_feedback {
            return false;
        }
        self.has_given_feedback = true;

        let mut updated = 0;
        for pawn_id in roster.iter() {
            if let Some(player) = world.player_mut(pawn_id) {
                player.last_checkpoint = self.location;
                updated += 1;
            }
        }
        info!(checkpoint = %self.id, updated, "checkpoint reached");
        true
    }
}

#[derive(Debug, Clone)]
pub struct Door {
    pub id: String,
    pub open: bool,
}

impl Door {
    pub fn new(layout: &DoorLayout) -> Self {
        Self {
            id: layout.id.clone(),
            open: layout.open,
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportStep {
    /// The linked door is closed; the trigger polls until it opens.
    Waiting,
    Scheduled(TimerHandle),
}

/// Door-gated teleport with a delayed position swap. Every overlapping pawn
/// waits and teleports on its own schedule.
#[derive(Debug, Clone)]
pub struct TeleportTrigger {
    pub id: String,
    pub door_id: String,
    pub target: Vec2,
    waiting: Vec<PawnId>,
    scheduled: HashMap<PawnId, TimerHandle>,
}

impl TeleportTrigger {
    pub fn new(layout: &TeleportLayout) -> Self {
        Self {
            id: layout.id.clone(),
            door_id: layout.door_id.clone(),
            target: layout.target,
            waiting: Vec::new(),
            scheduled: HashMap::new(),
        }
    }

    pub fn on_begin_overlap(
        &mut self,
        pawn_id: PawnId,
        door_open: bool,
        timers: &mut TimerQueue<FlowTimer>,
        delay: Duration,
    ) -> TeleportStep {
        if door_open {
            self.waiting.retain(|waiting| *waiting != pawn_id);
            return TeleportStep::Scheduled(self.schedule(pawn_id, timers, delay));
        }
        debug!(
            teleport = %self.id,
            door = %self.door_id,
            pawn_id,
            "door closed; player waiting"
        );
        if !self.waiting.contains(&pawn_id) {
            self.waiting.push(pawn_id);
        }
        TeleportStep::Waiting
    }

    /// Leaving the volume clears the pawn's wait for the door. A teleport
    /// that is already scheduled still fires.
    pub fn on_end_overlap(&mut self, pawn_id: PawnId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|waiting| *waiting != pawn_id);
        let left = before != self.waiting.len();
        if left {
            debug!(teleport = %self.id, pawn_id, "player left before the door opened");
        }
        left
    }

    /// Per-tick re-check of the waiting pawns. Returns the pawns scheduled on
    /// this tick.
    pub fn poll(
        &mut self,
        door_open: bool,
        timers: &mut TimerQueue<FlowTimer>,
        delay: Duration,
    ) -> Vec<PawnId> {
        if !door_open || self.waiting.is_empty() {
            return Vec::new();
        }
        let ready = std::mem::take(&mut self.waiting);
        for pawn_id in &ready {
            self.schedule(*pawn_id, timers, delay);
        }
        ready
    }

    /// Returns false for a timer that no longer belongs to this trigger.
    pub fn on_fired(&mut self, pawn_id: PawnId) -> bool {
        self.scheduled.remove(&pawn_id).is_some()
    }

    /// Forgets a pawn that is being destroyed and cancels its teleport.
    pub fn release(&mut self, pawn_id: PawnId, timers: &mut TimerQueue<FlowTimer>) {
        self.waiting.retain(|waiting| *waiting != pawn_id);
        if let Some(handle) = self.scheduled.remove(&pawn_id) {
            timers.cancel(handle);
        }
    }

    fn schedule(
        &mut self,
        pawn_id: PawnId,
        timers: &mut TimerQueue<FlowTimer>,
        delay: Duration,
    ) -> TimerHandle {
        if let Some(previous) = self.scheduled.remove(&pawn_id) {
            timers.cancel(previous);
        }
        let handle = timers.schedule(
            delay,
            FlowTimer::Teleport {
                trigger_id: self.id.clone(),
                pawn_id,
            },
        );
        self.scheduled.insert(pawn_id, handle);
        handle
    }
}

/// One-shot exit trigger of a level.
#[derive(Debug, Clone)]
pub struct LevelCompleteTrigger {
    pub id: String,
    reached: bool,
}

impl LevelCompleteTrigger {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reached: false,
        }
    }

    pub fn on_player_overlap(&mut self) -> bool {
        !std::mem::replace(&mut self.reached, true)
    }
}

/// Respawn prompt of a downed player. The respawn action starts disabled and
/// is enabled by a one-shot timer.
#[derive(Debug, Clone)]
pub struct RespawnMenu {
    pub connection_id: ConnectionId,
    enabled: bool,
    enable_timer: Option<TimerHandle>,
}

impl RespawnMenu {
    pub fn open(
        connection_id: ConnectionId,
        timers: &mut TimerQueue<FlowTimer>,
        delay: Duration,
    ) -> Self {
        let handle = timers.schedule(delay, FlowTimer::EnableRespawn { connection_id });
        Self {
            connection_id,
            enabled: false,
            enable_timer: Some(handle),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.enable_timer = None;
    }

    /// Re-disabling an already disabled action warns and succeeds.
    pub fn disable(&mut self) {
        if !self.enabled {
            warn!(connection_id = self.connection_id, "respawn button already disabled");
            return;
        }
        self.enabled = false;
    }

    pub fn teardown(&mut self, timers: &mut TimerQueue<FlowTimer>) {
        if let Some(handle) = self.enable_timer.take() {
            timers.cancel(handle);
        }
    }
}

/// Runs the death path for a player pawn. Out-of-lives players leave the roster.
///
/// Returns `Ok(None)` when the player was already down.
pub fn player_death(
    world: &mut World,
    roster: &mut PlayerRoster,
    pawn_id: PawnId,
) -> Result<Option<DeathOutcome>, FlowError> {
    let player = world
        .player_mut(pawn_id)
        .ok_or(FlowError::MissingPlayer { pawn_id })?;
    let outcome = player.player_death();
    match outcome {
        Some(DeathOutcome::OutOfLives) => {
            info!(pawn_id, "player out of lives");
            roster.remove(pawn_id);
        }
        Some(DeathOutcome::Downed { lives_left }) => {
            info!(pawn_id, lives_left, "player down");
        }
        None => debug!(pawn_id, "death ignored; player already down"),
    }
    Ok(outcome)
}

/// Revives the connection's player at its last checkpoint with full health.
/// Nothing changes unless both the pawn and its player entity resolve.
pub fn revive_at_checkpoint(
    world: &mut World,
    connection_id: ConnectionId,
) -> Result<Vec2, FlowError> {
    let pawn_id = world
        .possessed_pawn(connection_id)
        .map(|pawn| pawn.id)
        .ok_or(FlowError::MissingPawn { connection_id })?;
    let pawn = world
        .pawn_mut(pawn_id)
        .ok_or(FlowError::MissingPawn { connection_id })?;
    let player = pawn
        .as_player_mut()
        .ok_or(FlowError::MissingPlayer { pawn_id })?;
    let location = player.revive_at_checkpoint();
    pawn.location = location;
    Ok(location)
}
