//! Whole-document JSON backup.

use crate::document::TrackerDocument;
use crate::errors::{Error, Result};

/// Serialize the document as pretty-printed JSON, suitable for a download
/// the owner can stash anywhere.
pub fn export_backup(doc: &TrackerDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Parse a backup payload. Any JSON object carrying `clients` and
/// `exercises` keys is accepted; older backups run through the same
/// migration pipeline as on-disk files, so a file exported years ago still
/// restores. Restoring it into a live document is
/// [`crate::document::restore_backup`]'s job.
pub fn parse_backup(text: &str) -> Result<TrackerDocument> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("clients").is_none() || value.get("exercises").is_none() {
        return Err(Error::invalid_input(
            "not a tracker backup (expected clients and exercises)",
        ));
    }
    crate::document::migrate_to_current(value)
}
