// Lobby readiness gating: player threshold plus character selections.

use crate::domain::{CharacterSelectionLedger, FlowError, LevelState, World};
use tracing::{debug, info};

/// Counts lobby connections against the start threshold and arms the level
/// state once every connected player has chosen a character.
///
/// The threshold latch and the armed flag are never cleared by a player
/// leaving; only [`LobbyReadinessGate::consume`] disarms.
#[derive(Debug, Default)]
pub struct LobbyReadinessGate {
    connected: u32,
    threshold_met: bool,
}

impl LobbyReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_join(&mut self, level: &LevelState) {
        self.connected += 1;
        if !self.threshold_met && self.connected >= level.min_players_to_start {
            self.threshold_met = true;
            info!(
                connected = self.connected,
                required = level.min_players_to_start,
                "player threshold met"
            );
        }
    }

    pub fn on_leave(&mut self) {
        self.connected = self.connected.saturating_sub(1);
    }

    pub fn connected(&self) -> u32 {
        self.connected
    }

    /// Shape check for a start request. Any well-formed request is accepted;
    /// whether the game may start is decided by the conjunction below.
    pub fn validate_start_request(&self) -> bool {
        true
    }

    /// Arms `ready_to_start` iff the threshold latched and every connected
    /// controller has a recorded selection.
    pub fn check_game_start_reqs(
        &mut self,
        level: &mut LevelState,
        ledger: &CharacterSelectionLedger,
        world: &World,
    ) -> Result<(), FlowError> {
        if level.ready_to_start {
            return Ok(());
        }

        if !self.threshold_met {
            return Err(FlowError::ThresholdNotMet {
                connected: self.connected,
                required: level.min_players_to_start,
            });
        }

        let pending = world
            .controllers()
            .filter(|controller| {
                !controller.has_chosen_character || !ledger.has_selection(controller.connection_id)
            })
            .count();
        if pending > 0 {
            return Err(FlowError::SelectionsPending { pending });
        }

        level.ready_to_start = true;
        info!(connected = self.connected, "lobby armed for game start");
        Ok(())
    }

    /// Disarms immediately so a second start request cannot travel twice.
    pub fn consume(&mut self, level: &mut LevelState) -> Result<(), FlowError> {
        if !level.ready_to_start {
            return Err(FlowError::NotReady);
        }
        level.ready_to_start = false;
        debug!("game start consumed");
        Ok(())
    }
}
