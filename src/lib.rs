//! Core of a fan-fiction studio for Miraculous seasons: the persistent show
//! library, user settings, the Gemini generation gateway, and the script
//! narration pipeline. The rendering layer lives elsewhere and talks to
//! these stores directly.

pub mod audio;
pub mod continuity;
pub mod error;
pub mod events;
pub mod gemini;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::StudioError;

use events::StudioEvents;
use storage::{SettingsStore, ShowStore, StudioDb};

const DATA_DIR_NAME: &str = "miraculous-studio";
const DB_FILE_NAME: &str = "studio.db";

/// Handles to the studio's persistent stores plus the shared event channel.
pub struct Studio {
    pub shows: ShowStore,
    pub settings: SettingsStore,
    pub events: StudioEvents,
}

impl Studio {
    /// Open the studio against the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME);
        std::fs::create_dir_all(&data_dir)?;
        Self::open(&data_dir.join(DB_FILE_NAME))
    }

    /// Open the studio against an explicit database path.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let db = Arc::new(StudioDb::open(db_path)?);
        let events = StudioEvents::new();

        log::info!("Studio storage ready at {:?}", db_path);

        Ok(Self {
            shows: ShowStore::new(db.clone(), events.clone()),
            settings: SettingsStore::new(db, events.clone()),
            events,
        })
    }

    /// Gateway client bound to the current settings. Fails with a
    /// configuration error when no API key can be resolved.
    pub fn gateway(&self) -> Result<gemini::GeminiClient, StudioError> {
        gemini::GeminiClient::from_settings(&self.settings.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Show, ShowTheme};
    use tempfile::TempDir;

    #[test]
    fn test_open_wires_stores_to_one_database() {
        let temp_dir = TempDir::new().unwrap();
        let studio = Studio::open(&temp_dir.path().join("studio.db")).unwrap();

        let show = Show::new("Shared", "one database", ShowTheme::Catnoir);
        studio.shows.save(show.clone());
        assert_eq!(studio.shows.get_by_id(&show.id).unwrap().title, "Shared");

        let settings = studio.settings.load();
        assert!(settings.use_auto_key);
    }
}
