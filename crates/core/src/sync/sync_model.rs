//! Sync domain models.

use serde::{Deserialize, Serialize};

use crate::document::{Settings, TrackerDocument};

/// Connectivity/progress state shown next to the sync button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No exchange has run yet this session.
    Idle,
    /// An exchange is in flight.
    Syncing,
    /// The last exchange or push succeeded.
    Synced,
    /// The device is offline or the last attempt failed; local changes are
    /// queued.
    Offline,
}

/// A configured server endpoint plus the key that authenticates the gym.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConnection {
    pub api_url: String,
    pub api_key: String,
}

impl ServerConnection {
    /// `None` until both the server URL and API key are configured;
    /// without either, sync is silently off.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.api_url.trim().is_empty() || settings.api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

/// Server reply to an exchange: a replacement document when the server has
/// something newer than the timestamp we sent, otherwise nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncExchange {
    pub data: Option<TrackerDocument>,
    pub timestamp: Option<i64>,
}

/// Server acknowledgement of a push. The timestamp is mandatory; a reply
/// without one counts as a failed push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushAck {
    pub timestamp: i64,
}

/// What a full exchange did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No server connection configured; nothing was attempted.
    Skipped,
    /// The server sent a newer document and it replaced local collections.
    RemoteAdopted,
    /// The server had nothing newer; local state stands.
    LocalCurrent,
    /// The transport failed; local changes stay queued.
    Failed,
}

/// What a push attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Skipped,
    Acknowledged,
    Failed,
}
