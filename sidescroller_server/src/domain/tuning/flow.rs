use std::time::Duration;

/// Delays for the timed steps of the level flow.
#[derive(Debug, Clone, Copy)]
pub struct FlowTuning {
    /// How long the respawn action stays disabled after the menu opens.
    pub respawn_delay: Duration,

    /// Pause between a teleport becoming eligible and the position swap.
    pub teleport_delay: Duration,

    /// Celebration time between reaching the exit and travelling on.
    pub level_complete_delay: Duration,

    /// Lobby grace period before prompting for a character.
    pub character_select_delay: Duration,

    /// Time the death animation plays before a finalized player is cleaned up.
    pub death_cleanup_delay: Duration,
}

impl Default for FlowTuning {
    fn default() -> Self {
        Self {
            respawn_delay: Duration::from_secs(2),
            teleport_delay: Duration::from_secs(1),
            level_complete_delay: Duration::from_secs(3),
            character_select_delay: Duration::from_millis(250),
            death_cleanup_delay: Duration::from_millis(800),
        }
    }
}
