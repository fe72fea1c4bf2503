// Level transitions: lobby start, next level, game over and restart.

use crate::domain::{FlowError, LevelCatalog, LevelState, MapKind, TravelRequest};
use crate::use_cases::lobby::LobbyReadinessGate;
use tracing::{error, info};

/// Lobby to first level. The ready flag is consumed before the travel request
/// is handed back, so a start request arriving after travel cannot fire again.
pub fn start_game(
    level: &mut LevelState,
    gate: &mut LobbyReadinessGate,
    map: MapKind,
    catalog: &LevelCatalog,
) -> Result<TravelRequest, FlowError> {
    if map != MapKind::Lobby {
        return Err(FlowError::WrongMap { expected: "lobby" });
    }
    let travel = catalog
        .travel_to(MapKind::Level(level.current_level))
        .ok_or(FlowError::UnresolvedMap)?;
    gate.consume(level)?;
    info!(url = %travel.url, "starting game");
    Ok(travel)
}

/// Advances the level counter and travels on. Past the last catalogued level
/// the session goes to the credits map.
pub fn start_next_level(
    level: &mut LevelState,
    map: MapKind,
    catalog: &LevelCatalog,
) -> Result<TravelRequest, FlowError> {
    let MapKind::Level(_) = map else {
        return Err(FlowError::WrongMap { expected: "level" });
    };

    let next = level.current_level + 1;
    let target = if catalog.has_level(next) {
        MapKind::Level(next)
    } else {
        MapKind::Credits
    };
    let travel = catalog.travel_to(target).ok_or(FlowError::UnresolvedMap)?;
    level.current_level = next;
    info!(level = next, url = %travel.url, "starting next level");
    Ok(travel)
}

/// Route taken when the roster empties. `None` means the process must quit.
pub fn game_over_route(catalog: &LevelCatalog) -> Option<TravelRequest> {
    let travel = catalog.travel_to(MapKind::GameOver);
    if travel.is_none() {
        error!("game over map cannot be resolved");
    }
    travel
}

/// Back to the first level from a menu map.
pub fn restart(
    level: &mut LevelState,
    map: MapKind,
    catalog: &LevelCatalog,
) -> Result<TravelRequest, FlowError> {
    if !map.is_menu() {
        return Err(FlowError::WrongMap {
            expected: "game over menu",
        });
    }
    let travel = catalog
        .travel_to(MapKind::Level(1))
        .ok_or(FlowError::UnresolvedMap)?;
    level.current_level = 1;
    level.ready_to_start = false;
    info!(url = %travel.url, "restarting game");
    Ok(travel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LevelLayout;

    fn catalog(levels: usize) -> LevelCatalog {
        LevelCatalog {
            levels: vec![LevelLayout::default(); levels],
            ..LevelCatalog::default()
        }
    }

    #[test]
    fn when_not_in_lobby_then_start_game_aborts_without_consuming() {
        let mut level = LevelState::new(1);
        level.ready_to_start = true;
        let mut gate = LobbyReadinessGate::new();

        let result = start_game(&mut level, &mut gate, MapKind::Level(1), &catalog(1));

        assert_eq!(result, Err(FlowError::WrongMap { expected: "lobby" }));
        assert!(level.ready_to_start);
    }

    #[test]
    fn when_not_armed_then_start_game_declines() {
        let mut level = LevelState::new(1);
        let mut gate = LobbyReadinessGate::new();

        let result = start_game(&mut level, &mut gate, MapKind::Lobby, &catalog(1));

        assert_eq!(result, Err(FlowError::NotReady));
    }

    #[test]
    fn when_next_level_exists_then_counter_increments() {
        let mut level = LevelState::new(1);

        let travel = start_next_level(&mut level, MapKind::Level(1), &catalog(3))
            .expect("travel to level 2");

        assert_eq!(level.current_level, 2);
        assert_eq!(travel.map, MapKind::Level(2));
        assert_eq!(travel.map_path, "/Maps/Map_Level2");
    }

    #[test]
    fn when_on_last_level_then_next_level_goes_to_credits() {
        let mut level = LevelState::new(1);

        let travel =
            start_next_level(&mut level, MapKind::Level(1), &catalog(1)).expect("credits travel");

        assert_eq!(travel.map, MapKind::Credits);
    }

    #[test]
    fn when_current_map_is_not_a_level_then_next_level_aborts() {
        let mut level = LevelState::new(1);

        let result = start_next_level(&mut level, MapKind::Lobby, &catalog(2));

        assert_eq!(result, Err(FlowError::WrongMap { expected: "level" }));
        assert_eq!(level.current_level, 1);
    }

    #[test]
    fn when_restarting_from_game_over_then_level_one_is_loaded() {
        let mut level = LevelState::new(1);
        level.current_level = 3;

        let travel = restart(&mut level, MapKind::GameOver, &catalog(3)).expect("restart");

        assert_eq!(level.current_level, 1);
        assert_eq!(travel.map, MapKind::Level(1));
    }
}
