// JSON save-game store for the host profile.

use crate::domain::SaveData;
use std::io::{self, ErrorKind, Result};
use std::path::PathBuf;

pub struct SaveGameStore {
    path: PathBuf,
}

impl SaveGameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the save file. A missing or unreadable file yields defaults; the
    /// result is always sanitized.
    pub async fn load_or_default(&self) -> SaveData {
        let txt = match tokio::fs::read_to_string(&self.path).await {
            Ok(txt) => txt,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no save game; using defaults");
                return SaveData::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read save game");
                return SaveData::default();
            }
        };

        match serde_json::from_str::<SaveData>(&txt) {
            Ok(save) => save.sanitized(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt save game; using defaults"
                );
                SaveData::default()
            }
        }
    }

    /// Loads the profile and writes the sanitized values back when the stored
    /// file was unreadable or held out-of-range values. A missing file stays
    /// missing.
    pub async fn load_and_repair(&self) -> SaveData {
        let data = self.load_or_default().await;
        let Ok(stored) = tokio::fs::read_to_string(&self.path).await else {
            return data;
        };
        let repaired = match serde_json::from_str::<SaveData>(&stored) {
            Ok(parsed) => parsed != data,
            Err(_) => true,
        };
        if repaired && self.save(&data).await.is_ok() {
            tracing::info!(path = %self.path.display(), "save game repaired");
        }
        data
    }

    pub async fn save(&self, data: &SaveData) -> Result<()> {
        let txt = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
        tokio::fs::write(&self.path, txt).await.inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to write save game");
        })
    }
}
