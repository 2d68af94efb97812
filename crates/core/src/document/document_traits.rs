//! Store seam between the domain and its persistence backends.

use async_trait::async_trait;

use crate::clients::{Client, ClientInput, Gender};
use crate::errors::Result;
use crate::exercises::{Exercise, ExerciseInput};
use crate::records::{Record, SaveOutcome};

use super::{Settings, TrackerDocument};

/// Single-writer access to the tracker document.
///
/// Implementations hold the document behind one lock and run each mutation
/// through the functions in this module's mutation set within a single
/// critical section, so compound reads (gold detection, cascades) can never
/// interleave with another writer.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// A full copy of the current document.
    async fn snapshot(&self) -> Result<TrackerDocument>;

    async fn settings(&self) -> Result<Settings>;

    /// Name-sorted roster, optionally restricted to one gender.
    async fn list_clients(&self, gender: Option<Gender>) -> Result<Vec<Client>>;

    async fn get_client(&self, client_id: &str) -> Result<Option<Client>>;

    /// See [`super::upsert_client`] for the id semantics.
    async fn upsert_client(&self, input: ClientInput) -> Result<Option<Client>>;

    async fn delete_client(&self, client_id: &str) -> Result<bool>;

    /// Name-sorted exercise catalog.
    async fn list_exercises(&self) -> Result<Vec<Exercise>>;

    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>>;

    async fn upsert_exercise(&self, input: ExerciseInput) -> Result<Option<Exercise>>;

    async fn delete_exercise(&self, exercise_id: &str) -> Result<bool>;

    /// Attempt a lift against the replacement policy.
    async fn save_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<SaveOutcome>;

    /// Overwrite a best-record slot unconditionally.
    async fn force_update_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<Record>;

    async fn get_record(&self, client_id: &str, exercise_id: &str) -> Result<Option<Record>>;

    /// A client's records, minus rows whose exercise has been deleted.
    async fn records_for_client(&self, client_id: &str) -> Result<Vec<Record>>;

    async fn set_connection(&self, api_url: &str, api_key: &str) -> Result<()>;

    async fn update_api_url(&self, api_url: &str) -> Result<()>;

    async fn update_api_key(&self, api_key: &str) -> Result<()>;

    async fn set_gender_filter(&self, gender: Gender) -> Result<()>;

    async fn start_session(&self, client_id: &str) -> Result<Option<Client>>;

    async fn end_session(&self) -> Result<()>;

    async fn set_last_sync(&self, timestamp: i64) -> Result<()>;

    /// Adopt a server document; see [`super::apply_remote`].
    async fn apply_remote_document(
        &self,
        remote: TrackerDocument,
        server_timestamp: Option<i64>,
    ) -> Result<()>;

    /// Replace state from a backup; see [`super::restore_backup`].
    async fn restore_backup(&self, incoming: TrackerDocument) -> Result<()>;

    async fn import_clients(&self, rows: Vec<ClientInput>) -> Result<usize>;

    async fn import_exercises(&self, rows: Vec<ExerciseInput>) -> Result<usize>;

    async fn clear_all(&self) -> Result<()>;
}
