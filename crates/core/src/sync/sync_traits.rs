//! Transport seam between the reconciler and the records server.

use async_trait::async_trait;

use crate::document::TrackerDocument;
use crate::errors::Result;

use super::{PushAck, ServerConnection, SyncExchange};

/// The three calls the server exposes. The reconciler owns all policy
/// (when to call, what to do with the reply); implementations only move
/// bytes.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Check a key against an endpoint before anything is persisted.
    async fn validate(&self, api_url: &str, api_key: &str) -> Result<bool>;

    /// Offer the local document and its last-sync timestamp; the server
    /// replies with a newer document or with nothing.
    async fn exchange(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
        last_sync: i64,
    ) -> Result<SyncExchange>;

    /// Upload the local document as the new server copy.
    async fn push(
        &self,
        connection: &ServerConnection,
        document: &TrackerDocument,
    ) -> Result<PushAck>;
}
