// Owned session context. Every flow operation runs here, on the world task.

use crate::domain::level::LevelLayout;
use crate::domain::state::{DamageOutcome, DeathOutcome};
use crate::domain::tuning::flow::FlowTuning;
use crate::domain::tuning::player::PlayerTuning;
use crate::domain::{
    CharacterArchetype, CharacterSelectionLedger, Collectible, ConnectionId, FlowError,
    LevelCatalog, LevelState, MapKind, PawnId, PlayerRoster, PlayerSnapshot, TimerQueue,
    TravelRequest, Vec2, World,
};
use crate::use_cases::checkpoint::{
    self, CheckpointTrigger, Door, LevelCompleteTrigger, RespawnMenu, TeleportTrigger,
};
use crate::use_cases::level;
use crate::use_cases::lobby::LobbyReadinessGate;
use crate::use_cases::spawn::{self, SpawnOutcome, SpawnRequest};
use crate::use_cases::types::{
    FlowNotice, FlowTimer, GameEvent, NoticeKind, OverlapPhase, ServerState, WorldExit,
};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AuthoritySettings {
    pub min_players_to_start: u32,
    pub catalog: LevelCatalog,
    pub player: PlayerTuning,
    pub flow: FlowTuning,
    /// Archetype used on level load for connections that never chose one.
    pub default_archetype: CharacterArchetype,
}

impl AuthoritySettings {
    pub fn new(min_players_to_start: u32, catalog: LevelCatalog) -> Self {
        Self {
            min_players_to_start,
            catalog,
            player: PlayerTuning::default(),
            flow: FlowTuning::default(),
            default_archetype: CharacterArchetype::Pink,
        }
    }
}

/// Live trigger instances of the loaded map.
#[derive(Debug, Default)]
struct LevelTriggers {
    spawn_point: Vec2,
    checkpoints: Vec<CheckpointTrigger>,
    fall_off: HashSet<String>,
    doors: HashMap<String, Door>,
    teleports: Vec<TeleportTrigger>,
    level_complete: Vec<LevelCompleteTrigger>,
}

impl LevelTriggers {
    fn from_layout(layout: &LevelLayout) -> Self {
        Self {
            spawn_point: layout.spawn_point,
            checkpoints: layout.checkpoints.iter().map(CheckpointTrigger::new).collect(),
            fall_off: layout.fall_off_triggers.iter().map(|t| t.id.clone()).collect(),
            doors: layout
                .doors
                .iter()
                .map(|door| (door.id.clone(), Door::new(door)))
                .collect(),
            teleports: layout.teleports.iter().map(TeleportTrigger::new).collect(),
            level_complete: layout
                .level_complete_triggers
                .iter()
                .map(|t| LevelCompleteTrigger::new(t.id.clone()))
                .collect(),
        }
    }
}

/// The single writer of roster, ledger and level state.
///
/// Built once per server and rebuilt in place on every map travel; nothing
/// outside the world task holds a reference to it.
pub struct Authority {
    settings: AuthoritySettings,
    level: LevelState,
    map: MapKind,
    // Bumped on every map load so timers fired for the old map are dropped.
    map_epoch: u64,
    world: World,
    roster: PlayerRoster,
    ledger: CharacterSelectionLedger,
    gate: LobbyReadinessGate,
    triggers: LevelTriggers,
    respawn_menus: HashMap<ConnectionId, RespawnMenu>,
    // Connections that ran out of lives on the current map.
    eliminated: HashSet<ConnectionId>,
    timers: TimerQueue<FlowTimer>,
    notices: Vec<FlowNotice>,
}

impl Authority {
    pub fn new(settings: AuthoritySettings) -> Self {
        let triggers = LevelTriggers::from_layout(&settings.catalog.layout(MapKind::Lobby));
        Self {
            level: LevelState::new(settings.min_players_to_start),
            settings,
            map: MapKind::Lobby,
            map_epoch: 0,
            world: World::new(),
            roster: PlayerRoster::new(),
            ledger: CharacterSelectionLedger::new(),
            gate: LobbyReadinessGate::new(),
            triggers,
            respawn_menus: HashMap::new(),
            eliminated: HashSet::new(),
            timers: TimerQueue::new(),
            notices: Vec::new(),
        }
    }

    pub fn map(&self) -> MapKind {
        self.map
    }

    pub fn server_state(&self) -> ServerState {
        match self.map {
            MapKind::Lobby => ServerState::Lobby {
                players: self.gate.connected(),
                required: self.level.min_players_to_start,
                ready: self.level.ready_to_start,
            },
            MapKind::Level(index) => ServerState::Level { index },
            MapKind::GameOver => ServerState::GameOver,
            MapKind::Credits => ServerState::Credits,
        }
    }

    pub fn snapshot(&self) -> Vec<PlayerSnapshot> {
        self.world.snapshot()
    }

    pub fn drain_notices(&mut self) -> Vec<FlowNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Applies one request. Declines are logged here; the result is returned
    /// for callers that want to inspect it, never sent back to the client.
    pub fn handle(&mut self, event: GameEvent) -> Result<(), FlowError> {
        let op = event.name();
        let connection_id = event.connection_id();
        let result = match event {
            GameEvent::Join {
                connection_id,
                display_name,
            } => {
                self.on_join(connection_id, display_name);
                Ok(())
            }
            GameEvent::Leave { connection_id } => {
                self.on_leave(connection_id);
                Ok(())
            }
            GameEvent::SpawnPlayer {
                connection_id,
                archetype,
                label,
            } => self.request_spawn(connection_id, archetype, label),
            GameEvent::CheckGameStartReqs { .. } => self.check_game_start_reqs(),
            GameEvent::StartLevel { .. } => self.start_level(),
            GameEvent::TravelToLevel { .. } => self.travel_to_level(),
            GameEvent::Restart { .. } => self.restart(),
            GameEvent::Damage {
                connection_id,
                amount,
            } => self.damage(connection_id, amount),
            GameEvent::Overlap {
                connection_id,
                trigger_id,
                phase,
            } => self.overlap(connection_id, &trigger_id, phase),
            GameEvent::Interact {
                connection_id,
                door_id,
            } => self.interact(connection_id, &door_id),
            GameEvent::Respawn { connection_id } => self.respawn(connection_id),
            GameEvent::Collect {
                connection_id,
                item,
            } => self.collect(connection_id, item),
        };

        if let Err(err) = &result {
            if err.is_precondition() {
                debug!(op, connection_id, error = %err, "request declined");
            } else {
                warn!(op, connection_id, error = %err, "request aborted");
            }
        }
        result
    }

    /// Advances timers and per-tick checks. Returns an exit reason when the
    /// world task must stop.
    pub fn tick(&mut self, dt: Duration) -> Option<WorldExit> {
        let epoch = self.map_epoch;
        for action in self.timers.advance(dt) {
            if self.map_epoch != epoch {
                break;
            }
            self.fire(action);
        }

        let delay = self.settings.flow.teleport_delay;
        let LevelTriggers {
            teleports, doors, ..
        } = &mut self.triggers;
        for teleport in teleports.iter_mut() {
            let open = doors.get(&teleport.door_id).is_some_and(|door| door.open);
            for pawn_id in teleport.poll(open, &mut self.timers, delay) {
                debug!(teleport = %teleport.id, pawn_id, "door opened; teleport scheduled");
            }
        }

        if self.map.watches_roster() && self.roster.is_empty() {
            info!("no players left in level");
            match level::game_over_route(&self.settings.catalog) {
                Some(travel) => self.travel(travel),
                None => return Some(WorldExit::HardQuit),
            }
        }
        None
    }

    fn on_join(&mut self, connection_id: ConnectionId, display_name: String) {
        if self.world.controller(connection_id).is_some() {
            warn!(connection_id, "duplicate join ignored");
            return;
        }

        info!(connection_id, %display_name, "player joined");
        self.world.add_controller(connection_id, display_name);
        self.gate.on_join(&self.level);
        let placeholder = self.world.spawn_placeholder(self.triggers.spawn_point);
        self.world.possess(connection_id, placeholder);
        self.enter_map(connection_id);
    }

    fn on_leave(&mut self, connection_id: ConnectionId) {
        if let Some(pawn_id) = self.world.possessed_pawn(connection_id).map(|pawn| pawn.id) {
            if self.roster.contains(pawn_id) {
                self.roster.remove(pawn_id);
            }
            for teleport in &mut self.triggers.teleports {
                teleport.release(pawn_id, &mut self.timers);
            }
        }
        if let Some(mut menu) = self.respawn_menus.remove(&connection_id) {
            menu.teardown(&mut self.timers);
        }
        // Connection ids are never reused, so the choice cannot be claimed again.
        self.ledger.remove(connection_id);
        self.eliminated.remove(&connection_id);

        match self.world.remove_controller(connection_id) {
            Some(_) => {
                self.gate.on_leave();
                info!(connection_id, "player left");
            }
            None => warn!(connection_id, "leave for unknown connection"),
        }
    }

    /// Puts a connection that already holds a placeholder into the current map.
    fn enter_map(&mut self, connection_id: ConnectionId) {
        let result = match self.map {
            MapKind::Lobby => match self.ledger.get(connection_id) {
                Some(archetype) => self.spawn_for(connection_id, Some(archetype), true),
                None => {
                    self.timers.schedule(
                        self.settings.flow.character_select_delay,
                        FlowTimer::CharacterSelectPrompt { connection_id },
                    );
                    return;
                }
            },
            MapKind::Level(_) => {
                let archetype = self
                    .ledger
                    .get(connection_id)
                    .unwrap_or(self.settings.default_archetype);
                self.spawn_for(connection_id, Some(archetype), false)
            }
            MapKind::GameOver | MapKind::Credits => return,
        };

        if let Err(err) = result {
            warn!(connection_id, error = %err, "failed to spawn player on map entry");
        }
    }

    fn spawn_for(
        &mut self,
        connection_id: ConnectionId,
        archetype: Option<CharacterArchetype>,
        persist_selection: bool,
    ) -> Result<SpawnOutcome, FlowError> {
        let label = archetype
            .map(|archetype| archetype.label().to_string())
            .unwrap_or_default();
        self.spawn_with_label(connection_id, archetype, label, persist_selection)
    }

    fn spawn_with_label(
        &mut self,
        connection_id: ConnectionId,
        archetype: Option<CharacterArchetype>,
        label: String,
        persist_selection: bool,
    ) -> Result<SpawnOutcome, FlowError> {
        let outcome = spawn::spawn_player(
            &mut self.world,
            &mut self.ledger,
            &mut self.roster,
            &self.settings.player,
            SpawnRequest {
                connection_id,
                archetype,
                label,
                persist_selection,
            },
        )?;
        if let Some(mut menu) = self.respawn_menus.remove(&connection_id) {
            menu.teardown(&mut self.timers);
        }
        Ok(outcome)
    }

    fn request_spawn(
        &mut self,
        connection_id: ConnectionId,
        archetype: Option<CharacterArchetype>,
        label: String,
    ) -> Result<(), FlowError> {
        if self.map.is_menu() {
            return Err(FlowError::WrongMap {
                expected: "lobby or level",
            });
        }
        // In a level only the initial handoff is allowed: a live, downed or
        // eliminated player keeps the entity and lives it has.
        if matches!(self.map, MapKind::Level(_)) {
            if self.eliminated.contains(&connection_id) {
                return Err(FlowError::Eliminated { connection_id });
            }
            if self.player_pawn(connection_id).is_ok() {
                return Err(FlowError::AlreadySpawned { connection_id });
            }
        }
        self.spawn_with_label(connection_id, archetype, label, true)
            .map(|_| ())
    }

    fn check_game_start_reqs(&mut self) -> Result<(), FlowError> {
        if self.map != MapKind::Lobby {
            return Err(FlowError::WrongMap { expected: "lobby" });
        }
        if !self.gate.validate_start_request() {
            return Err(FlowError::NotReady);
        }
        self.gate
            .check_game_start_reqs(&mut self.level, &self.ledger, &self.world)
    }

    fn start_level(&mut self) -> Result<(), FlowError> {
        let travel = level::start_game(
            &mut self.level,
            &mut self.gate,
            self.map,
            &self.settings.catalog,
        )?;
        self.travel(travel);
        Ok(())
    }

    fn travel_to_level(&mut self) -> Result<(), FlowError> {
        if !self.level.ready_to_start {
            return Err(FlowError::NotReady);
        }
        self.start_level()
    }

    fn restart(&mut self) -> Result<(), FlowError> {
        let travel = level::restart(&mut self.level, self.map, &self.settings.catalog)?;
        self.travel(travel);
        Ok(())
    }

    /// The connection's pawn, if it carries the player capability.
    fn player_pawn(&self, connection_id: ConnectionId) -> Result<PawnId, FlowError> {
        let pawn = self
            .world
            .possessed_pawn(connection_id)
            .ok_or(FlowError::MissingPawn { connection_id })?;
        match pawn.as_player() {
            Some(_) => Ok(pawn.id),
            None => Err(FlowError::MissingPlayer { pawn_id: pawn.id }),
        }
    }

    fn is_alive(&self, pawn_id: PawnId) -> bool {
        self.world
            .pawn(pawn_id)
            .and_then(|pawn| pawn.as_player())
            .is_some_and(|player| player.alive)
    }

    fn damage(&mut self, connection_id: ConnectionId, amount: f32) -> Result<(), FlowError> {
        let pawn_id = self.player_pawn(connection_id)?;
        let player = self
            .world
            .player_mut(pawn_id)
            .ok_or(FlowError::MissingPlayer { pawn_id })?;
        match player.apply_damage(amount) {
            DamageOutcome::Depleted => self.run_death(connection_id, pawn_id),
            DamageOutcome::Hurt { health } => {
                debug!(connection_id, health, "player hurt");
                Ok(())
            }
            DamageOutcome::Ignored => {
                debug!(connection_id, "damage ignored; player is down");
                Ok(())
            }
        }
    }

    fn run_death(
        &mut self,
        connection_id: ConnectionId,
        pawn_id: PawnId,
    ) -> Result<(), FlowError> {
        match checkpoint::player_death(&mut self.world, &mut self.roster, pawn_id)? {
            Some(DeathOutcome::Downed { lives_left }) => {
                if let Some(mut previous) = self.respawn_menus.remove(&connection_id) {
                    previous.teardown(&mut self.timers);
                }
                let menu = RespawnMenu::open(
                    connection_id,
                    &mut self.timers,
                    self.settings.flow.respawn_delay,
                );
                self.respawn_menus.insert(connection_id, menu);
                self.notices.push(FlowNotice::to(
                    connection_id,
                    NoticeKind::RespawnMenuOpened { lives_left },
                ));
            }
            Some(DeathOutcome::OutOfLives) => {
                self.eliminated.insert(connection_id);
                self.timers.schedule(
                    self.settings.flow.death_cleanup_delay,
                    FlowTimer::DeathCleanup { pawn_id },
                );
                self.notices
                    .push(FlowNotice::to(connection_id, NoticeKind::OutOfLives));
            }
            None => {}
        }
        Ok(())
    }

    fn overlap(
        &mut self,
        connection_id: ConnectionId,
        trigger_id: &str,
        phase: OverlapPhase,
    ) -> Result<(), FlowError> {
        // Only player entities interact with triggers.
        let Ok(pawn_id) = self.player_pawn(connection_id) else {
            debug!(connection_id, trigger_id, "overlap by non-player ignored");
            return Ok(());
        };
        if phase == OverlapPhase::Begin && !self.is_alive(pawn_id) {
            debug!(connection_id, trigger_id, "overlap by downed player ignored");
            return Ok(());
        }

        if let Some(index) = self
            .triggers
            .checkpoints
            .iter()
            .position(|checkpoint| checkpoint.id == trigger_id)
        {
            let checkpoint = &mut self.triggers.checkpoints[index];
            if phase == OverlapPhase::Begin
                && checkpoint.on_player_overlap(&mut self.world, &self.roster)
            {
                self.notices
                    .push(FlowNotice::broadcast(NoticeKind::CheckpointReached {
                        checkpoint_id: trigger_id.to_string(),
                    }));
            }
            return Ok(());
        }

        if self.triggers.fall_off.contains(trigger_id) {
            if phase == OverlapPhase::Begin {
                info!(connection_id, trigger_id, "player fell off the level");
                return self.run_death(connection_id, pawn_id);
            }
            return Ok(());
        }

        if let Some(index) = self
            .triggers
            .teleports
            .iter()
            .position(|teleport| teleport.id == trigger_id)
        {
            let teleport = &mut self.triggers.teleports[index];
            let door_open = self
                .triggers
                .doors
                .get(&teleport.door_id)
                .map(|door| door.open)
                .ok_or_else(|| FlowError::MissingDoor {
                    door_id: teleport.door_id.clone(),
                })?;
            match phase {
                OverlapPhase::Begin => {
                    teleport.on_begin_overlap(
                        pawn_id,
                        door_open,
                        &mut self.timers,
                        self.settings.flow.teleport_delay,
                    );
                }
                OverlapPhase::End => {
                    teleport.on_end_overlap(pawn_id);
                }
            }
            return Ok(());
        }

        if let Some(index) = self
            .triggers
            .level_complete
            .iter()
            .position(|trigger| trigger.id == trigger_id)
        {
            let trigger = &mut self.triggers.level_complete[index];
            if phase == OverlapPhase::Begin && trigger.on_player_overlap() {
                info!(level = self.level.current_level, "level complete");
                self.notices.push(FlowNotice::broadcast(NoticeKind::LevelComplete {
                    index: self.level.current_level,
                }));
                self.timers.schedule(
                    self.settings.flow.level_complete_delay,
                    FlowTimer::LevelComplete,
                );
            }
            return Ok(());
        }

        Err(FlowError::UnknownTrigger {
            trigger_id: trigger_id.to_string(),
        })
    }

    fn interact(&mut self, connection_id: ConnectionId, door_id: &str) -> Result<(), FlowError> {
        if self.world.controller(connection_id).is_none() {
            return Err(FlowError::MissingController { connection_id });
        }
        let door = self
            .triggers
            .doors
            .get_mut(door_id)
            .ok_or_else(|| FlowError::MissingDoor {
                door_id: door_id.to_string(),
            })?;
        let open = door.toggle();
        info!(connection_id, door_id, open, "door toggled");
        self.notices.push(FlowNotice::broadcast(NoticeKind::DoorToggled {
            door_id: door_id.to_string(),
            open,
        }));
        Ok(())
    }

    fn respawn(&mut self, connection_id: ConnectionId) -> Result<(), FlowError> {
        let menu = self
            .respawn_menus
            .get(&connection_id)
            .ok_or(FlowError::RespawnMenuClosed)?;
        if !menu.is_enabled() {
            return Err(FlowError::RespawnLocked);
        }

        let location = checkpoint::revive_at_checkpoint(&mut self.world, connection_id)?;
        // Confirming turns the respawn action off before the menu closes.
        if let Some(mut menu) = self.respawn_menus.remove(&connection_id) {
            menu.disable();
            menu.teardown(&mut self.timers);
        }
        info!(connection_id, x = location.x, y = location.y, "player revived");
        self.notices.push(FlowNotice::to(
            connection_id,
            NoticeKind::Revived {
                x: location.x,
                y: location.y,
            },
        ));
        Ok(())
    }

    fn collect(&mut self, connection_id: ConnectionId, item: Collectible) -> Result<(), FlowError> {
        let pawn_id = self.player_pawn(connection_id)?;
        let player = self
            .world
            .player_mut(pawn_id)
            .ok_or(FlowError::MissingPlayer { pawn_id })?;
        if !player.alive {
            debug!(connection_id, "pickup ignored; player is down");
            return Ok(());
        }
        player.collect(item);
        debug!(connection_id, ?item, "item collected");
        Ok(())
    }

    fn fire(&mut self, action: FlowTimer) {
        match action {
            FlowTimer::EnableRespawn { connection_id } => {
                if let Some(menu) = self.respawn_menus.get_mut(&connection_id) {
                    menu.enable();
                    self.notices
                        .push(FlowNotice::to(connection_id, NoticeKind::RespawnEnabled));
                }
            }
            FlowTimer::Teleport {
                trigger_id,
                pawn_id,
            } => {
                let Some(teleport) = self
                    .triggers
                    .teleports
                    .iter_mut()
                    .find(|teleport| teleport.id == trigger_id)
                else {
                    return;
                };
                if !teleport.on_fired(pawn_id) {
                    debug!(pawn_id, teleport = %trigger_id, "stale teleport dropped");
                    return;
                }
                let target = teleport.target;
                let Some(pawn) = self.world.pawn_mut(pawn_id) else {
                    debug!(pawn_id, "teleport target pawn is gone");
                    return;
                };
                pawn.location = target;
                if let Some(player) = pawn.as_player() {
                    info!(
                        connection_id = player.connection_id,
                        teleport = %trigger_id,
                        "player teleported"
                    );
                    self.notices.push(FlowNotice::to(
                        player.connection_id,
                        NoticeKind::Teleported {
                            x: target.x,
                            y: target.y,
                        },
                    ));
                }
            }
            FlowTimer::DeathCleanup { pawn_id } => self.death_cleanup(pawn_id),
            FlowTimer::LevelComplete => {
                match level::start_next_level(&mut self.level, self.map, &self.settings.catalog) {
                    Ok(travel) => self.travel(travel),
                    Err(err) => warn!(error = %err, "cannot leave completed level"),
                }
            }
            FlowTimer::CharacterSelectPrompt { connection_id } => {
                let needs_prompt = self.map == MapKind::Lobby
                    && self
                        .world
                        .controller(connection_id)
                        .is_some_and(|controller| !controller.has_chosen_character);
                if needs_prompt {
                    self.notices
                        .push(FlowNotice::to(connection_id, NoticeKind::SelectCharacter));
                }
            }
        }
    }

    /// Finalizes an out-of-lives player: the roster removal runs again and the
    /// dead entity is swapped for a spectator placeholder.
    fn death_cleanup(&mut self, pawn_id: PawnId) {
        self.roster.remove(pawn_id);
        for teleport in &mut self.triggers.teleports {
            teleport.release(pawn_id, &mut self.timers);
        }

        let Some((connection_id, location)) = self.world.pawn(pawn_id).and_then(|pawn| {
            pawn.as_player()
                .map(|player| (player.connection_id, pawn.location))
        }) else {
            return;
        };
        let still_possessed = self
            .world
            .controller(connection_id)
            .is_some_and(|controller| controller.pawn == Some(pawn_id));
        if !still_possessed {
            return;
        }

        let placeholder = self.world.spawn_placeholder(location);
        self.world.unpossess(connection_id);
        self.world.possess(connection_id, placeholder);
        self.world.destroy_pawn(pawn_id);
        debug!(connection_id, pawn_id, "dead player cleaned up");
    }

    fn travel(&mut self, request: TravelRequest) {
        info!(
            map = request.map.name(),
            url = %request.url,
            seamless = request.seamless,
            "server travel"
        );
        self.notices.push(FlowNotice::broadcast(NoticeKind::Travel {
            map_path: request.map_path,
            url: request.url,
            seamless: request.seamless,
        }));
        self.load_map(request.map);
    }

    /// Tears down the current map and rebuilds the session on `map`.
    fn load_map(&mut self, map: MapKind) {
        self.map = map;
        self.map_epoch += 1;
        self.timers.clear();
        self.respawn_menus.clear();
        self.eliminated.clear();
        self.roster.clear();
        self.world.clear_pawns();
        self.triggers = LevelTriggers::from_layout(&self.settings.catalog.layout(map));

        for connection_id in self.world.connection_ids() {
            let placeholder = self.world.spawn_placeholder(self.triggers.spawn_point);
            self.world.possess(connection_id, placeholder);
            self.enter_map(connection_id);
        }
        debug!(
            map = map.name(),
            players = self.roster.len(),
            "map loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerEntity;
    use crate::domain::level::{Checkpoint, DoorLayout, TeleportLayout, TriggerLayout};

    const TICK: Duration = Duration::from_millis(16);

    fn join(authority: &mut Authority, connection_id: ConnectionId) {
        authority
            .handle(GameEvent::Join {
                connection_id,
                display_name: format!("player-{connection_id}"),
            })
            .expect("join");
    }

    fn select(
        authority: &mut Authority,
        connection_id: ConnectionId,
        archetype: CharacterArchetype,
    ) {
        authority
            .handle(GameEvent::SpawnPlayer {
                connection_id,
                archetype: Some(archetype),
                label: archetype.label().to_string(),
            })
            .expect("spawn");
    }

    fn player_of(authority: &Authority, connection_id: ConnectionId) -> PlayerEntity {
        authority
            .world
            .possessed_pawn(connection_id)
            .and_then(|pawn| pawn.as_player())
            .cloned()
            .expect("connection should possess a player entity")
    }

    fn pawn_location(authority: &Authority, connection_id: ConnectionId) -> Vec2 {
        authority
            .world
            .possessed_pawn(connection_id)
            .map(|pawn| pawn.location)
            .expect("possessed pawn")
    }

    fn level_layout() -> LevelLayout {
        LevelLayout {
            spawn_point: Vec2::new(0.0, 0.0),
            checkpoints: vec![Checkpoint {
                id: "cp1".to_string(),
                location: Vec2::new(300.0, 20.0),
            }],
            fall_off_triggers: vec![TriggerLayout {
                id: "pit".to_string(),
            }],
            doors: vec![DoorLayout {
                id: "gate".to_string(),
                open: false,
            }],
            teleports: vec![TeleportLayout {
                id: "tp".to_string(),
                door_id: "gate".to_string(),
                target: Vec2::new(900.0, 0.0),
            }],
            level_complete_triggers: vec![TriggerLayout {
                id: "exit".to_string(),
            }],
        }
    }

    /// Joins `players` connections, selects characters and starts level 1.
    fn authority_in_level(players: u64, catalog: LevelCatalog) -> Authority {
        let mut authority = Authority::new(AuthoritySettings::new(players as u32, catalog));
        for connection_id in 1..=players {
            join(&mut authority, connection_id);
            select(&mut authority, connection_id, CharacterArchetype::Green);
        }
        authority
            .handle(GameEvent::CheckGameStartReqs { connection_id: 1 })
            .expect("ready");
        authority
            .handle(GameEvent::StartLevel { connection_id: 1 })
            .expect("start");
        authority.drain_notices();
        authority
    }

    fn level_catalog() -> LevelCatalog {
        LevelCatalog {
            levels: vec![level_layout()],
            ..LevelCatalog::default()
        }
    }

    #[test]
    fn when_third_player_selects_then_lobby_arms_and_start_travels_to_level_one() {
        let mut authority = Authority::new(AuthoritySettings::new(3, LevelCatalog::default()));
        join(&mut authority, 1);
        join(&mut authority, 2);
        select(&mut authority, 1, CharacterArchetype::Pink);
        select(&mut authority, 2, CharacterArchetype::Blue);

        let declined = authority.handle(GameEvent::CheckGameStartReqs { connection_id: 1 });
        assert_eq!(
            declined,
            Err(FlowError::ThresholdNotMet {
                connected: 2,
                required: 3
            })
        );
        assert!(!authority.level.ready_to_start);

        join(&mut authority, 3);
        select(&mut authority, 3, CharacterArchetype::Black);
        assert_eq!(
            authority.handle(GameEvent::CheckGameStartReqs { connection_id: 3 }),
            Ok(())
        );
        assert!(authority.level.ready_to_start);
        authority.drain_notices();

        assert_eq!(
            authority.handle(GameEvent::StartLevel { connection_id: 1 }),
            Ok(())
        );

        assert!(!authority.level.ready_to_start);
        assert_eq!(authority.map(), MapKind::Level(1));
        let notices = authority.drain_notices();
        assert!(notices.contains(&FlowNotice::broadcast(NoticeKind::Travel {
            map_path: "/Maps/Map_Level1".to_string(),
            url: "/Maps/Map_Level1?listen".to_string(),
            seamless: true,
        })));
        assert_eq!(authority.roster.len(), 3);
        assert_eq!(player_of(&authority, 2).archetype, CharacterArchetype::Blue);

        // A late start request after travel cannot fire a second time.
        assert_eq!(
            authority.handle(GameEvent::StartLevel { connection_id: 2 }),
            Err(FlowError::WrongMap { expected: "lobby" })
        );
    }

    #[test]
    fn when_start_requested_before_arming_then_nothing_travels() {
        let mut authority = Authority::new(AuthoritySettings::new(1, LevelCatalog::default()));
        join(&mut authority, 1);

        assert_eq!(
            authority.handle(GameEvent::TravelToLevel { connection_id: 1 }),
            Err(FlowError::NotReady)
        );
        assert_eq!(
            authority.handle(GameEvent::CheckGameStartReqs { connection_id: 1 }),
            Err(FlowError::SelectionsPending { pending: 1 })
        );
        assert_eq!(authority.map(), MapKind::Lobby);
    }

    #[test]
    fn when_lethal_hit_lands_twice_then_player_leaves_roster_once() {
        let mut authority = authority_in_level(2, level_catalog());
        let pawn_id = authority.player_pawn(1).expect("player pawn");
        if let Some(player) = authority.world.player_mut(pawn_id) {
            player.lives = 0;
        }
        assert_eq!(player_of(&authority, 1).health, 100.0);

        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 150.0,
            })
            .expect("damage");
        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 150.0,
            })
            .expect("damage");

        let player = player_of(&authority, 1);
        assert_eq!(player.health, 0.0);
        assert!(player.out_of_lives);
        assert_eq!(authority.roster.len(), 1);
        assert!(!authority.roster.contains(pawn_id));
        assert_eq!(authority.timers.len(), 1);

        authority.tick(authority.settings.flow.death_cleanup_delay);

        assert!(authority.world.pawn(pawn_id).is_none());
        assert!(authority.world.possessed_pawn(1).is_some());
        assert_eq!(authority.roster.len(), 1);
        assert_eq!(authority.map(), MapKind::Level(1));
    }

    #[test]
    fn when_last_player_runs_out_of_lives_then_session_routes_to_game_over() {
        let mut authority = authority_in_level(1, level_catalog());
        let pawn_id = authority.player_pawn(1).expect("player pawn");
        if let Some(player) = authority.world.player_mut(pawn_id) {
            player.lives = 0;
        }

        authority
            .handle(GameEvent::Overlap {
                connection_id: 1,
                trigger_id: "pit".to_string(),
                phase: OverlapPhase::Begin,
            })
            .expect("fall off");

        assert_eq!(authority.tick(TICK), None);
        assert_eq!(authority.map(), MapKind::GameOver);
        assert_eq!(authority.server_state(), ServerState::GameOver);
        // Menu maps never re-run the empty-roster check.
        assert_eq!(authority.tick(TICK), None);
        assert_eq!(authority.map(), MapKind::GameOver);

        authority
            .handle(GameEvent::Restart { connection_id: 1 })
            .expect("restart");
        assert_eq!(authority.map(), MapKind::Level(1));
        assert_eq!(authority.roster.len(), 1);
    }

    #[test]
    fn when_game_over_map_is_unresolvable_then_world_hard_quits() {
        let catalog = LevelCatalog {
            game_over_map: None,
            ..level_catalog()
        };
        let mut authority = authority_in_level(1, catalog);
        authority
            .handle(GameEvent::Leave { connection_id: 1 })
            .expect("leave");

        assert_eq!(authority.tick(TICK), Some(WorldExit::HardQuit));
    }

    #[test]
    fn when_lobby_is_empty_then_game_over_check_does_not_run() {
        let mut authority = Authority::new(AuthoritySettings::new(2, level_catalog()));

        assert_eq!(authority.tick(TICK), None);
        assert_eq!(authority.map(), MapKind::Lobby);
    }

    #[test]
    fn when_door_opens_while_player_waits_then_teleport_fires_once_after_delay() {
        let mut authority = authority_in_level(1, level_catalog());
        let delay = authority.settings.flow.teleport_delay;
        authority
            .handle(GameEvent::Overlap {
                connection_id: 1,
                trigger_id: "tp".to_string(),
                phase: OverlapPhase::Begin,
            })
            .expect("overlap");
        let start = pawn_location(&authority, 1);

        authority.tick(TICK);
        assert!(authority.timers.is_empty());
        assert_eq!(pawn_location(&authority, 1), start);

        authority
            .handle(GameEvent::Interact {
                connection_id: 1,
                door_id: "gate".to_string(),
            })
            .expect("open door");
        authority.tick(TICK);
        assert_eq!(authority.timers.len(), 1);
        assert_eq!(pawn_location(&authority, 1), start);

        authority.tick(delay);
        assert_eq!(pawn_location(&authority, 1), Vec2::new(900.0, 0.0));
        let notices = authority.drain_notices();
        let teleports = notices
            .iter()
            .filter(|notice| matches!(notice.kind, NoticeKind::Teleported { .. }))
            .count();
        assert_eq!(teleports, 1);

        let pawn_id = authority.player_pawn(1).expect("player pawn");
        if let Some(pawn) = authority.world.pawn_mut(pawn_id) {
            pawn.location = Vec2::ZERO;
        }
        authority.tick(delay);
        assert_eq!(pawn_location(&authority, 1), Vec2::ZERO);
    }

    #[test]
    fn when_player_leaves_teleport_before_door_opens_then_no_teleport_happens() {
        let mut authority = authority_in_level(1, level_catalog());
        let overlap = |phase| GameEvent::Overlap {
            connection_id: 1,
            trigger_id: "tp".to_string(),
            phase,
        };
        authority.handle(overlap(OverlapPhase::Begin)).expect("enter");
        authority.tick(TICK);
        authority.handle(overlap(OverlapPhase::End)).expect("leave");
        let start = pawn_location(&authority, 1);

        authority
            .handle(GameEvent::Interact {
                connection_id: 1,
                door_id: "gate".to_string(),
            })
            .expect("open door");
        authority.tick(TICK);
        authority.tick(Duration::from_secs(5));

        assert_eq!(pawn_location(&authority, 1), start);
        assert!(authority.timers.is_empty());
    }

    #[test]
    fn when_downed_player_respawns_then_they_return_to_checkpoint_with_full_health() {
        let mut authority = authority_in_level(2, level_catalog());
        authority
            .handle(GameEvent::Overlap {
                connection_id: 2,
                trigger_id: "cp1".to_string(),
                phase: OverlapPhase::Begin,
            })
            .expect("checkpoint");
        assert_eq!(player_of(&authority, 1).last_checkpoint, Vec2::new(300.0, 20.0));

        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 500.0,
            })
            .expect("damage");
        assert_eq!(player_of(&authority, 1).lives, 2);
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Err(FlowError::RespawnLocked)
        );

        authority.tick(authority.settings.flow.respawn_delay);
        assert!(
            authority
                .drain_notices()
                .contains(&FlowNotice::to(1, NoticeKind::RespawnEnabled))
        );
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Ok(())
        );

        let player = player_of(&authority, 1);
        assert!(player.alive);
        assert_eq!(player.health, player.max_health);
        assert_eq!(pawn_location(&authority, 1), Vec2::new(300.0, 20.0));
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Err(FlowError::RespawnMenuClosed)
        );
    }

    #[test]
    fn when_exit_reached_on_last_level_then_session_travels_to_credits() {
        let mut authority = authority_in_level(1, level_catalog());
        let exit = || GameEvent::Overlap {
            connection_id: 1,
            trigger_id: "exit".to_string(),
            phase: OverlapPhase::Begin,
        };
        authority.handle(exit()).expect("exit");
        authority.handle(exit()).expect("exit again");
        assert_eq!(authority.timers.len(), 1);

        authority.tick(authority.settings.flow.level_complete_delay);

        assert_eq!(authority.map(), MapKind::Credits);
        assert_eq!(authority.level.current_level, 2);
    }

    #[test]
    fn when_player_leaves_lobby_then_their_choice_is_forgotten() {
        let mut authority = Authority::new(AuthoritySettings::new(3, LevelCatalog::default()));
        join(&mut authority, 1);
        select(&mut authority, 1, CharacterArchetype::Yellow);
        join(&mut authority, 2);
        select(&mut authority, 2, CharacterArchetype::Blue);

        authority
            .handle(GameEvent::Leave { connection_id: 1 })
            .expect("leave");

        assert_eq!(authority.roster.len(), 1);
        assert_eq!(authority.ledger.len(), 1);
        assert_eq!(authority.ledger.get(1), None);
        assert_eq!(authority.ledger.get(2), Some(CharacterArchetype::Blue));
    }

    #[test]
    fn when_player_already_in_level_requests_spawn_then_it_is_rejected() {
        let mut authority = authority_in_level(2, level_catalog());
        let pawn_id = authority.player_pawn(1).expect("player pawn");

        let result = authority.handle(GameEvent::SpawnPlayer {
            connection_id: 1,
            archetype: Some(CharacterArchetype::Black),
            label: "Black".to_string(),
        });

        assert_eq!(result, Err(FlowError::AlreadySpawned { connection_id: 1 }));
        assert_eq!(authority.player_pawn(1), Ok(pawn_id));
        assert_eq!(player_of(&authority, 1).archetype, CharacterArchetype::Green);
        assert_eq!(authority.roster.len(), 2);
    }

    #[test]
    fn when_downed_player_requests_spawn_then_lives_and_lock_are_kept() {
        let mut authority = authority_in_level(2, level_catalog());
        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 500.0,
            })
            .expect("damage");

        let result = authority.handle(GameEvent::SpawnPlayer {
            connection_id: 1,
            archetype: Some(CharacterArchetype::Green),
            label: "Green".to_string(),
        });

        assert_eq!(result, Err(FlowError::AlreadySpawned { connection_id: 1 }));
        let player = player_of(&authority, 1);
        assert!(!player.alive);
        assert_eq!(player.health, 0.0);
        assert_eq!(player.lives, 2);
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Err(FlowError::RespawnLocked)
        );
    }

    #[test]
    fn when_eliminated_player_requests_spawn_then_game_over_still_routes() {
        let mut authority = authority_in_level(1, level_catalog());
        let pawn_id = authority.player_pawn(1).expect("player pawn");
        if let Some(player) = authority.world.player_mut(pawn_id) {
            player.lives = 0;
        }
        authority
            .handle(GameEvent::Overlap {
                connection_id: 1,
                trigger_id: "pit".to_string(),
                phase: OverlapPhase::Begin,
            })
            .expect("fall off");

        let spawn = || GameEvent::SpawnPlayer {
            connection_id: 1,
            archetype: Some(CharacterArchetype::Green),
            label: "Green".to_string(),
        };
        assert_eq!(
            authority.handle(spawn()),
            Err(FlowError::Eliminated { connection_id: 1 })
        );
        assert!(authority.roster.is_empty());

        assert_eq!(authority.tick(TICK), None);
        assert_eq!(authority.map(), MapKind::GameOver);
    }

    #[test]
    fn when_downed_player_respawns_after_delay_then_lost_life_stays_lost() {
        let mut authority = authority_in_level(2, level_catalog());
        let pawn_id = authority.player_pawn(1).expect("player pawn");
        let starting_lives = authority.settings.player.starting_lives;

        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 60.0,
            })
            .expect("damage");
        authority
            .handle(GameEvent::Damage {
                connection_id: 1,
                amount: 60.0,
            })
            .expect("damage");
        assert!(
            authority
                .drain_notices()
                .contains(&FlowNotice::to(
                    1,
                    NoticeKind::RespawnMenuOpened {
                        lives_left: starting_lives - 1
                    }
                ))
        );
        assert!(authority.roster.contains(pawn_id));
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Err(FlowError::RespawnLocked)
        );

        authority.tick(authority.settings.flow.respawn_delay / 2);
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Err(FlowError::RespawnLocked)
        );
        authority.tick(authority.settings.flow.respawn_delay);
        assert_eq!(
            authority.handle(GameEvent::Respawn { connection_id: 1 }),
            Ok(())
        );

        let player = player_of(&authority, 1);
        assert!(player.alive);
        assert_eq!(player.lives, starting_lives - 1);
        assert_eq!(authority.player_pawn(1), Ok(pawn_id));
        assert!(authority.roster.contains(pawn_id));
        assert_eq!(authority.roster.len(), 2);
    }

    #[test]
    fn when_two_players_wait_at_teleport_and_one_leaves_then_only_the_other_teleports() {
        let mut authority = authority_in_level(2, level_catalog());
        let delay = authority.settings.flow.teleport_delay;
        let overlap = |connection_id, phase| GameEvent::Overlap {
            connection_id,
            trigger_id: "tp".to_string(),
            phase,
        };
        authority
            .handle(overlap(1, OverlapPhase::Begin))
            .expect("enter");
        authority
            .handle(overlap(2, OverlapPhase::Begin))
            .expect("enter");
        authority.handle(overlap(1, OverlapPhase::End)).expect("exit");
        let start = pawn_location(&authority, 1);

        authority
            .handle(GameEvent::Interact {
                connection_id: 2,
                door_id: "gate".to_string(),
            })
            .expect("open door");
        authority.tick(TICK);
        assert_eq!(authority.timers.len(), 1);
        authority.tick(delay);

        assert_eq!(pawn_location(&authority, 1), start);
        assert_eq!(pawn_location(&authority, 2), Vec2::new(900.0, 0.0));
        assert!(authority.timers.is_empty());
    }

    #[test]
    fn when_player_leaves_during_scheduled_teleport_then_timer_is_cancelled() {
        let mut authority = authority_in_level(2, level_catalog());
        authority
            .handle(GameEvent::Interact {
                connection_id: 1,
                door_id: "gate".to_string(),
            })
            .expect("open door");
        for connection_id in [1, 2] {
            authority
                .handle(GameEvent::Overlap {
                    connection_id,
                    trigger_id: "tp".to_string(),
                    phase: OverlapPhase::Begin,
                })
                .expect("enter");
        }
        assert_eq!(authority.timers.len(), 2);

        authority
            .handle(GameEvent::Leave { connection_id: 1 })
            .expect("leave");

        assert_eq!(authority.timers.len(), 1);
        authority.tick(authority.settings.flow.teleport_delay);
        assert_eq!(pawn_location(&authority, 2), Vec2::new(900.0, 0.0));
    }

    #[test]
    fn when_lobby_player_has_not_chosen_then_they_are_prompted() {
        let mut authority = Authority::new(AuthoritySettings::new(3, LevelCatalog::default()));
        join(&mut authority, 4);

        authority.tick(authority.settings.flow.character_select_delay);

        assert_eq!(
            authority.drain_notices(),
            vec![FlowNotice::to(4, NoticeKind::SelectCharacter)]
        );
    }

    #[test]
    fn when_unknown_trigger_overlapped_then_request_is_aborted() {
        let mut authority = authority_in_level(1, level_catalog());

        let result = authority.handle(GameEvent::Overlap {
            connection_id: 1,
            trigger_id: "nowhere".to_string(),
            phase: OverlapPhase::Begin,
        });

        assert_eq!(
            result,
            Err(FlowError::UnknownTrigger {
                trigger_id: "nowhere".to_string()
            })
        );
    }

    #[test]
    fn when_collectibles_picked_up_then_player_stats_change() {
        let mut authority = authority_in_level(1, level_catalog());
        for item in [
            Collectible::Gem { value: 5 },
            Collectible::Cherries { count: 2 },
            Collectible::ExtraLife,
        ] {
            authority
                .handle(GameEvent::Collect {
                    connection_id: 1,
                    item,
                })
                .expect("collect");
        }

        let player = player_of(&authority, 1);
        assert_eq!(player.gems, 5);
        assert_eq!(player.points, 5);
        assert_eq!(player.cherries, 2);
        assert_eq!(player.lives, 4);
    }
}
