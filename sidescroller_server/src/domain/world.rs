// Pawns and controllers of the currently loaded map.

use crate::domain::state::{ConnectionId, PawnId, PlayerEntity, PlayerSnapshot, Vec2};
use std::collections::HashMap;

/// What a pawn is. Capabilities are queried through [`Pawn::as_player`]
/// instead of assuming every pawn is a player entity.
#[derive(Debug, Clone)]
pub enum PawnBody {
    /// Spectator pawn a connection holds until it picks a character.
    Placeholder,
    Player(PlayerEntity),
}

#[derive(Debug, Clone)]
pub struct Pawn {
    pub id: PawnId,
    pub location: Vec2,
    pub rotation: f32,
    pub body: PawnBody,
}

impl Pawn {
    pub fn as_player(&self) -> Option<&PlayerEntity> {
        match &self.body {
            PawnBody::Player(player) => Some(player),
            PawnBody::Placeholder => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerEntity> {
        match &mut self.body {
            PawnBody::Player(player) => Some(player),
            PawnBody::Placeholder => None,
        }
    }
}

/// Server-side representative of a connection.
#[derive(Debug, Clone)]
pub struct Controller {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub pawn: Option<PawnId>,
    pub has_chosen_character: bool,
}

#[derive(Debug, Default)]
pub struct World {
    pawns: HashMap<PawnId, Pawn>,
    controllers: HashMap<ConnectionId, Controller>,
    next_pawn_id: PawnId,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_pawn_id: 1,
            ..Self::default()
        }
    }

    pub fn add_controller(&mut self, connection_id: ConnectionId, display_name: String) {
        self.controllers.insert(
            connection_id,
            Controller {
                connection_id,
                display_name,
                pawn: None,
                has_chosen_character: false,
            },
        );
    }

    /// Removes the controller and destroys the pawn it possessed.
    pub fn remove_controller(&mut self, connection_id: ConnectionId) -> Option<Controller> {
        let controller = self.controllers.remove(&connection_id)?;
        if let Some(pawn_id) = controller.pawn {
            self.pawns.remove(&pawn_id);
        }
        Some(controller)
    }

    pub fn controller(&self, connection_id: ConnectionId) -> Option<&Controller> {
        self.controllers.get(&connection_id)
    }

    pub fn controller_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Controller> {
        self.controllers.get_mut(&connection_id)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.values()
    }

    /// Connection ids in ascending order, for deterministic iteration.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.controllers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn insert_pawn(&mut self, location: Vec2, rotation: f32, body: PawnBody) -> PawnId {
        let id = self.next_pawn_id;
        self.next_pawn_id += 1;
        self.pawns.insert(
            id,
            Pawn {
                id,
                location,
                rotation,
                body,
            },
        );
        id
    }

    pub fn spawn_placeholder(&mut self, location: Vec2) -> PawnId {
        self.insert_pawn(location, 0.0, PawnBody::Placeholder)
    }

    pub fn spawn_player(&mut self, location: Vec2, rotation: f32, player: PlayerEntity) -> PawnId {
        self.insert_pawn(location, rotation, PawnBody::Player(player))
    }

    pub fn pawn(&self, pawn_id: PawnId) -> Option<&Pawn> {
        self.pawns.get(&pawn_id)
    }

    pub fn pawn_mut(&mut self, pawn_id: PawnId) -> Option<&mut Pawn> {
        self.pawns.get_mut(&pawn_id)
    }

    pub fn player_mut(&mut self, pawn_id: PawnId) -> Option<&mut PlayerEntity> {
        self.pawns.get_mut(&pawn_id).and_then(Pawn::as_player_mut)
    }

    pub fn pawn_count(&self) -> usize {
        self.pawns.len()
    }

    /// The pawn currently possessed by the connection, if it still exists.
    pub fn possessed_pawn(&self, connection_id: ConnectionId) -> Option<&Pawn> {
        let pawn_id = self.controllers.get(&connection_id)?.pawn?;
        self.pawns.get(&pawn_id)
    }

    pub fn possess(&mut self, connection_id: ConnectionId, pawn_id: PawnId) -> bool {
        if !self.pawns.contains_key(&pawn_id) {
            return false;
        }
        match self.controllers.get_mut(&connection_id) {
            Some(controller) => {
                controller.pawn = Some(pawn_id);
                true
            }
            None => false,
        }
    }

    pub fn unpossess(&mut self, connection_id: ConnectionId) -> Option<PawnId> {
        self.controllers.get_mut(&connection_id)?.pawn.take()
    }

    pub fn destroy_pawn(&mut self, pawn_id: PawnId) -> Option<Pawn> {
        self.pawns.remove(&pawn_id)
    }

    /// Drops every pawn and detaches all controllers (map teardown).
    pub fn clear_pawns(&mut self) {
        self.pawns.clear();
        for controller in self.controllers.values_mut() {
            controller.pawn = None;
        }
    }

    pub fn snapshot(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<PlayerSnapshot> = self
            .controllers
            .values()
            .filter_map(|controller| {
                let pawn = self.pawns.get(&controller.pawn?)?;
                let player = pawn.as_player();
                Some(PlayerSnapshot {
                    connection_id: controller.connection_id,
                    pawn_id: pawn.id,
                    archetype: player.map(|p| p.archetype),
                    x: pawn.location.x,
                    y: pawn.location.y,
                    health: player.map_or(0.0, |p| p.health),
                    lives: player.map_or(0, |p| p.lives),
                    points: player.map_or(0, |p| p.points),
                    gems: player.map_or(0, |p| p.gems),
                    cherries: player.map_or(0, |p| p.cherries),
                    alive: player.is_some_and(|p| p.alive),
                })
            })
            .collect();
        players.sort_by_key(|snapshot| snapshot.connection_id);
        players
    }
}
