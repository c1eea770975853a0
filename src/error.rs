use thiserror::Error;

/// Typed error hierarchy for the studio core.
///
/// Variants map one-to-one onto how a failure is surfaced: configuration
/// problems block the triggering action and point the user at Settings,
/// generation failures are retried manually, storage failures degrade to
/// empty/default data, and missing records render as an empty state.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Audio(String),
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<anyhow::Error> for StudioError {
    fn from(e: anyhow::Error) -> Self {
        StudioError::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for StudioError {
    fn from(e: rusqlite::Error) -> Self {
        StudioError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::Storage(e.to_string())
    }
}

/// Provider transport errors count as generation failures; the caller's
/// only recovery is to trigger the call again.
impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::Generation(e.to_string())
    }
}
