//! Document shape migrations. Both the storage loader and backup restore
//! funnel raw JSON through here before it becomes a typed document.

use serde_json::Value;

use crate::errors::Result;

use super::{TrackerDocument, SCHEMA_VERSION};

/// Bring a raw JSON value up to the current shape, then parse it.
/// A document newer than this build is parsed as-is; unknown fields drop
/// and the version is stamped back down to what this build writes.
pub fn migrate_to_current(mut value: Value) -> Result<TrackerDocument> {
    let mut version = value
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    while version < SCHEMA_VERSION {
        value = match version {
            0 => backfill_defaults(value),
            _ => value,
        };
        version += 1;
    }

    let mut document: TrackerDocument = serde_json::from_value(value)?;
    document.schema_version = SCHEMA_VERSION;
    Ok(document)
}

/// v0 -> v1: v0 documents predate the version stamp and may be missing any
/// collection or settings field. Fill each absent one with its default;
/// values already present win.
fn backfill_defaults(mut value: Value) -> Value {
    let Some(obj) = value.as_object_mut() else {
        return value;
    };
    for collection in ["clients", "exercises", "records"] {
        obj.entry(collection)
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    let settings = obj
        .entry("settings")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if let Some(settings) = settings.as_object_mut() {
        for (key, default) in [
            ("apiKey", Value::String(String::new())),
            ("apiUrl", Value::String(String::new())),
            ("genderFilter", Value::String("male".to_string())),
            ("clientModeActive", Value::Bool(false)),
            ("activeClientId", Value::Null),
            ("lastSync", Value::from(0)),
        ] {
            settings.entry(key).or_insert(default);
        }
    }
    value
}
