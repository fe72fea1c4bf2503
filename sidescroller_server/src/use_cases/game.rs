use super::authority::Authority;
use super::types::{FlowNotice, GameEvent, ServerState, WorldExit, WorldUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{error, info};

/// Fixed-step loop that owns the [`Authority`]. Network handlers only reach it
/// through `input_rx`; results leave through the broadcast and watch channels.
pub async fn world_task(
    mut authority: Authority,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    notice_tx: broadcast::Sender<FlowNotice>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) -> WorldExit {
    let mut tick: u64 = 0;
    let _ = server_state_tx.send(authority.server_state());

    // Drive the fixed-step game loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("world task shutting down");
                return WorldExit::Shutdown;
            }
            _ = interval.tick() => {}
        }

        while let Ok(ev) = input_rx.try_recv() {
            // Declines are logged inside the authority.
            let _ = authority.handle(ev);
        }

        let exit = authority.tick(tick_interval);

        for notice in authority.drain_notices() {
            let _ = notice_tx.send(notice);
        }

        if let Some(exit) = exit {
            error!(?exit, "world task stopping");
            return exit;
        }

        let state = authority.server_state();
        server_state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        tick += 1;
        let _ = world_tx.send(WorldUpdate {
            tick,
            players: authority.snapshot(),
        });
    }
}
