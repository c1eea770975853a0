pub mod migrate;
pub mod models;


use anyhow::Result;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::StudioError;
use crate::events::{StudioEvent, StudioEvents};

pub use models::*;

/// Fixed record keys; one serialized JSON document per key.
const SHOWS_KEY: &str = "shows";
const SETTINGS_KEY: &str = "settings";

/// Key-value persistence engine.
///
/// One table, one JSON document per key. The higher-level stores read and
/// rewrite whole documents; there is no partial update at this boundary, so
/// the last writer wins when two processes race.
pub struct StudioDb {
    conn: Arc<Mutex<Connection>>,
}

impl StudioDb {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        ",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get_record(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_record(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, now],
        )?;
        Ok(())
    }
}

// =========================================================================
// Show repository
// =========================================================================

/// Durable store for the show collection.
///
/// Reads migrate and validate the raw document (see [`migrate`]) before it
/// crosses into the typed model; corrupt data degrades to an empty
/// collection instead of failing the caller. Writes rewrite the whole
/// collection; a failed write is reported through the event channel and
/// never propagates.
pub struct ShowStore {
    db: Arc<StudioDb>,
    events: StudioEvents,
}

impl ShowStore {
    pub fn new(db: Arc<StudioDb>, events: StudioEvents) -> Self {
        Self { db, events }
    }

    /// Load every show, most recent first.
    pub fn load(&self) -> Vec<Show> {
        let raw = match self.db.get_record(SHOWS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Failed to read show collection: {}", e);
                return Vec::new();
            }
        };

        let doc: Value = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("Show collection is not valid JSON, starting empty: {}", e);
                return Vec::new();
            }
        };

        let mut migrated = migrate::migrate_shows(doc);
        let shows = migrated
            .get_mut("shows")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new()));

        match serde_json::from_value(shows) {
            Ok(shows) => shows,
            Err(e) => {
                log::error!("Show collection failed validation, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Prepend a new show so the collection stays most-recent-first.
    pub fn save(&self, show: Show) {
        let mut shows = self.load();
        shows.insert(0, show);
        self.persist(&shows);
    }

    /// Replace the show with a matching id. Unknown ids are ignored.
    pub fn update(&self, updated: Show) {
        let mut shows = self.load();
        if let Some(slot) = shows.iter_mut().find(|s| s.id == updated.id) {
            *slot = updated;
            self.persist(&shows);
        }
    }

    pub fn delete(&self, show_id: &str) {
        let mut shows = self.load();
        shows.retain(|s| s.id != show_id);
        self.persist(&shows);
    }

    /// Flip the favorite flag on one show. Unknown ids are ignored.
    pub fn toggle_favorite(&self, show_id: &str) {
        let mut shows = self.load();
        if let Some(show) = shows.iter_mut().find(|s| s.id == show_id) {
            show.is_favorite = !show.is_favorite;
            self.persist(&shows);
        }
    }

    /// Append an episode to a show. Placement within the season is the
    /// caller's concern; nothing here checks order or uniqueness.
    pub fn add_episode(&self, show_id: &str, episode: Episode) {
        let mut shows = self.load();
        if let Some(show) = shows.iter_mut().find(|s| s.id == show_id) {
            show.episodes.push(episode);
            self.persist(&shows);
        }
    }

    /// Replace an episode by id inside the matching show. A miss on either
    /// id is a no-op.
    pub fn update_episode(&self, show_id: &str, updated: Episode) {
        let mut shows = self.load();
        if let Some(show) = shows.iter_mut().find(|s| s.id == show_id) {
            if let Some(slot) = show.episodes.iter_mut().find(|e| e.id == updated.id) {
                *slot = updated;
                self.persist(&shows);
            }
        }
    }

    pub fn get_by_id(&self, show_id: &str) -> Result<Show, StudioError> {
        self.load()
            .into_iter()
            .find(|s| s.id == show_id)
            .ok_or_else(|| StudioError::NotFound(format!("show {}", show_id)))
    }

    /// Unlock the next season. No episode records are created; the season
    /// stays empty until episodes are added.
    pub fn create_new_season(&self, show_id: &str) {
        let mut shows = self.load();
        if let Some(show) = shows.iter_mut().find(|s| s.id == show_id) {
            show.max_season += 1;
            self.persist(&shows);
        }
    }

    /// Rewrite the whole collection. Errors are downgraded to a
    /// [`StudioEvent::StorageWarning`]; in-memory state stays valid and the
    /// user can retry.
    fn persist(&self, shows: &[Show]) {
        let doc = serde_json::json!({
            "version": migrate::SCHEMA_VERSION,
            "shows": shows,
        });
        let result = serde_json::to_string(&doc)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.db.set_record(SHOWS_KEY, &raw));
        if let Err(e) = result {
            log::error!("Failed to persist show collection: {}", e);
            self.events.emit(StudioEvent::StorageWarning(format!(
                "Your library could not be saved: {}",
                e
            )));
        }
    }
}

// =========================================================================
// Settings
// =========================================================================

/// Single-record store for user preferences.
pub struct SettingsStore {
    db: Arc<StudioDb>,
    events: StudioEvents,
}

impl SettingsStore {
    pub fn new(db: Arc<StudioDb>, events: StudioEvents) -> Self {
        Self { db, events }
    }

    /// Stored values shallow-merged over the defaults; corrupt or missing
    /// data yields pure defaults.
    pub fn load(&self) -> UserSettings {
        match self.db.get_record(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Settings record failed to parse, using defaults: {}", e);
                UserSettings::default()
            }),
            Ok(None) => UserSettings::default(),
            Err(e) => {
                log::warn!("Failed to read settings, using defaults: {}", e);
                UserSettings::default()
            }
        }
    }

    /// Overwrite the stored record wholesale and notify subscribers.
    pub fn save(&self, settings: &UserSettings) {
        let result = serde_json::to_string(settings)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.db.set_record(SETTINGS_KEY, &raw));
        match result {
            Ok(()) => {
                self.events
                    .emit(StudioEvent::SettingsChanged(settings.clone()));
            }
            Err(e) => {
                log::error!("Failed to save settings: {}", e);
                self.events.emit(StudioEvent::StorageWarning(format!(
                    "Settings could not be saved: {}",
                    e
                )));
            }
        }
    }
}
