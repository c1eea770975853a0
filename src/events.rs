//! Studio event channel.
//!
//! Settings changes and storage warnings fan out to interested views over a
//! broadcast channel, so theme and accent-color updates apply immediately
//! and failed writes surface as non-blocking notifications.

use tokio::sync::broadcast;

use crate::storage::UserSettings;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// Settings were saved; dependent views re-read dark mode and accent.
    SettingsChanged(UserSettings),
    /// A write to the backing store failed; in-memory state is still valid.
    StorageWarning(String),
}

/// Shared handle for publishing and subscribing to studio events.
#[derive(Debug, Clone)]
pub struct StudioEvents {
    tx: broadcast::Sender<StudioEvent>,
}

impl StudioEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget publish; delivery is best-effort when nobody listens.
    pub(crate) fn emit(&self, event: StudioEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for StudioEvents {
    fn default() -> Self {
        Self::new()
    }
}
