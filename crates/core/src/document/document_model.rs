//! Persisted document shape.

use serde::{Deserialize, Serialize};

use crate::clients::{Client, Gender};
use crate::exercises::Exercise;
use crate::records::Record;

/// Version stamp written into every persisted document. Bump this when the
/// shape changes and add a matching step in [`super::migrate_to_current`].
pub const SCHEMA_VERSION: u32 = 1;

/// Device-local preferences and server credentials. These ride inside the
/// document for persistence but are never surrendered to the server: a
/// remote document replaces collections only, settings stay local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub gender_filter: Gender,
    #[serde(default)]
    pub client_mode_active: bool,
    #[serde(default)]
    pub active_client_id: Option<String>,
    /// Millisecond timestamp of the last server exchange, 0 when never
    /// synced.
    #[serde(default)]
    pub last_sync: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            gender_filter: Gender::Male,
            client_mode_active: false,
            active_client_id: None,
            last_sync: 0,
        }
    }
}

/// The entire tracker state. Small enough (a gym's roster, not a SaaS
/// tenant) that it is read, mutated, and written as one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerDocument {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for TrackerDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            clients: Vec::new(),
            exercises: Vec::new(),
            records: Vec::new(),
            settings: Settings::default(),
        }
    }
}

impl TrackerDocument {
    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    pub fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    /// The single best-record slot for a (client, exercise) pair.
    pub fn record_for(&self, client_id: &str, exercise_id: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.client_id == client_id && r.exercise_id == exercise_id)
    }

    /// Roster view: optionally restricted to one gender, sorted by name.
    pub fn clients_sorted(&self, gender: Option<Gender>) -> Vec<Client> {
        let mut clients: Vec<Client> = self
            .clients
            .iter()
            .filter(|c| gender.map_or(true, |g| c.gender == g))
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        clients
    }

    /// Exercise catalog sorted by name.
    pub fn exercises_sorted(&self) -> Vec<Exercise> {
        let mut exercises = self.exercises.clone();
        exercises.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        exercises
    }

    /// A client's records, dropping rows whose exercise no longer exists so
    /// profile views never render a dangling reference.
    pub fn records_for_client(&self, client_id: &str) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| r.client_id == client_id && self.exercise(&r.exercise_id).is_some())
            .cloned()
            .collect()
    }
}
