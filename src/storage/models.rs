use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visual theme applied to a show's cards and detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowTheme {
    Ladybug,
    Catnoir,
}

impl Default for ShowTheme {
    fn default() -> Self {
        Self::Ladybug
    }
}

/// Accent color used by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    Red,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
}

impl Default for AccentColor {
    fn default() -> Self {
        Self::Red
    }
}

/// A single generated script unit inside a show's season.
///
/// `(season_number, order)` is intended to be unique within a show, but the
/// store does not enforce it; placement is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub season_number: u32,
    /// Positional rank within the season, starting at 1.
    pub order: u32,
    pub title: String,
    pub premise: String,
    pub script: String,
    pub post_credit_scene: String,
    /// Generated cover art as a data URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    /// Millisecond epoch.
    pub created_at: i64,
}

impl Episode {
    /// Fresh episode with a generated id and creation timestamp.
    pub fn new(
        season_number: u32,
        order: u32,
        title: impl Into<String>,
        premise: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            season_number,
            order,
            title: title.into(),
            premise: premise.into(),
            script: String::new(),
            post_credit_scene: String::new(),
            image_url: None,
            image_prompt: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

/// A fan-made season container holding episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    pub title: String,
    pub description: String,
    pub theme: ShowTheme,
    pub is_favorite: bool,
    /// Millisecond epoch.
    pub created_at: i64,
    /// Highest season number unlocked so far; always >= 1. Episodes are
    /// expected to reference seasons in `[1, max_season]`.
    pub max_season: u32,
    /// Ordered by insertion.
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl Show {
    /// Fresh show with one unlocked season and no episodes.
    pub fn new(title: impl Into<String>, description: impl Into<String>, theme: ShowTheme) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            theme,
            is_favorite: false,
            created_at: Utc::now().timestamp_millis(),
            max_season: 1,
            episodes: Vec::new(),
        }
    }
}

fn default_use_auto_key() -> bool {
    true
}

fn default_script_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_user_name() -> String {
    "Guardian".to_string()
}

/// User preferences, one record.
///
/// Field-level serde defaults give the shallow-merge read semantics: stored
/// values win, anything missing falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Resolve the API key from the environment instead of `custom_api_key`.
    #[serde(default = "default_use_auto_key")]
    pub use_auto_key: bool,
    #[serde(default)]
    pub custom_api_key: String,
    #[serde(default = "default_script_model")]
    pub script_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub accent_color: AccentColor,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            use_auto_key: default_use_auto_key(),
            custom_api_key: String::new(),
            script_model: default_script_model(),
            image_model: default_image_model(),
            user_name: default_user_name(),
            dark_mode: false,
            accent_color: AccentColor::default(),
        }
    }
}
