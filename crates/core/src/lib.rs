//! Domain logic for an offline-first gym personal-records tracker.
//!
//! Everything here is storage- and transport-agnostic: the document and
//! its mutation rules, ranking and leaderboard assembly, roster
//! import/export, and the sync reconciler. Persistence and HTTP live in
//! the companion storage and server-sync crates behind the
//! [`document::TrackerStore`] and [`sync::SyncTransport`] seams.

pub mod clients;
pub mod document;
pub mod errors;
pub mod exercises;
pub mod import_export;
pub mod leaderboard;
pub mod records;
pub mod sync;
pub mod tracker;

pub use errors::{Error, Result};
