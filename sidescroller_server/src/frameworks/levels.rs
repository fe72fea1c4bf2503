// Level catalog loaded from a TOML file, falling back to the built-in catalog.

use crate::domain::LevelCatalog;
use std::io::{self, Result};
use std::path::Path;

pub fn parse_catalog(txt: &str) -> Result<LevelCatalog> {
    toml::from_str(txt).map_err(|e| io::Error::other(format!("parse level catalog: {e}")))
}

pub async fn load_catalog(path: Option<&Path>) -> Result<LevelCatalog> {
    let Some(path) = path else {
        tracing::debug!("LEVELS_PATH unset; using built-in level catalog");
        return Ok(LevelCatalog::default());
    };

    let txt = tokio::fs::read_to_string(path).await.inspect_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read level catalog");
    })?;
    let catalog = parse_catalog(&txt)?;

    if catalog.level_count() == 0 {
        tracing::warn!(path = %path.display(), "level catalog has no levels; start will fail");
    }
    tracing::info!(
        path = %path.display(),
        levels = catalog.level_count(),
        "level catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MapKind;

    const SAMPLE: &str = r#"
lobby_map = "/Maps/Map_Lobby"
level_map_prefix = "/Maps/Map_Level"

[lobby]
spawn_point = { x = 0.0, y = 0.0 }

[[levels]]
spawn_point = { x = 10.0, y = 5.0 }
checkpoints = [{ id = "cp1", location = { x = 300.0, y = 20.0 } }]
fall_off_triggers = [{ id = "pit" }]
doors = [{ id = "gate" }]
teleports = [{ id = "tp", door_id = "gate", target = { x = 900.0, y = 0.0 } }]
level_complete_triggers = [{ id = "exit" }]

[[levels]]
"#;

    #[test]
    fn when_catalog_lists_two_levels_then_both_resolve() {
        let catalog = parse_catalog(SAMPLE).expect("parse");

        assert_eq!(catalog.level_count(), 2);
        assert_eq!(
            catalog.resolve(MapKind::Level(2)).as_deref(),
            Some("/Maps/Map_Level2")
        );
        assert_eq!(catalog.layout(MapKind::Level(1)).doors.len(), 1);
    }

    #[test]
    fn when_menu_maps_are_omitted_then_defaults_are_kept() {
        let catalog = parse_catalog(SAMPLE).expect("parse");

        assert!(catalog.resolve(MapKind::GameOver).is_some());
    }

    #[test]
    fn when_toml_is_malformed_then_loading_fails() {
        assert!(parse_catalog("levels = 3").is_err());
    }

    #[tokio::test]
    async fn when_no_path_is_configured_then_builtin_catalog_is_used() {
        let catalog = load_catalog(None).await.expect("builtin");

        assert_eq!(catalog, LevelCatalog::default());
    }
}
