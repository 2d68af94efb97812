//! In-memory [`TrackerStore`], for tests and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::clients::{Client, ClientInput, Gender};
use crate::errors::Result;
use crate::exercises::{Exercise, ExerciseInput};
use crate::records::{Record, SaveOutcome};

use super::{document_mutations as mutations, Settings, TrackerDocument, TrackerStore};

/// The reference [`TrackerStore`]: the document behind one async mutex,
/// every mutation a single critical section, nothing persisted.
pub struct MemoryStore {
    state: Mutex<TrackerDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_document(TrackerDocument::default())
    }

    pub fn with_document(document: TrackerDocument) -> Self {
        Self {
            state: Mutex::new(document),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn snapshot(&self) -> Result<TrackerDocument> {
        Ok(self.state.lock().await.clone())
    }

    async fn settings(&self) -> Result<Settings> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn list_clients(&self, gender: Option<Gender>) -> Result<Vec<Client>> {
        Ok(self.state.lock().await.clients_sorted(gender))
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.state.lock().await.client(client_id).cloned())
    }

    async fn upsert_client(&self, input: ClientInput) -> Result<Option<Client>> {
        let mut doc = self.state.lock().await;
        Ok(mutations::upsert_client(&mut doc, input))
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let mut doc = self.state.lock().await;
        Ok(mutations::delete_client(&mut doc, client_id))
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        Ok(self.state.lock().await.exercises_sorted())
    }

    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        Ok(self.state.lock().await.exercise(exercise_id).cloned())
    }

    async fn upsert_exercise(&self, input: ExerciseInput) -> Result<Option<Exercise>> {
        let mut doc = self.state.lock().await;
        Ok(mutations::upsert_exercise(&mut doc, input))
    }

    async fn delete_exercise(&self, exercise_id: &str) -> Result<bool> {
        let mut doc = self.state.lock().await;
        Ok(mutations::delete_exercise(&mut doc, exercise_id))
    }

    async fn save_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<SaveOutcome> {
        let mut doc = self.state.lock().await;
        mutations::save_record(&mut doc, client_id, exercise_id, weight, reps, now_millis())
    }

    async fn force_update_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<Record> {
        let mut doc = self.state.lock().await;
        mutations::force_update_record(&mut doc, client_id, exercise_id, weight, reps, now_millis())
    }

    async fn get_record(&self, client_id: &str, exercise_id: &str) -> Result<Option<Record>> {
        Ok(self
            .state
            .lock()
            .await
            .record_for(client_id, exercise_id)
            .cloned())
    }

    async fn records_for_client(&self, client_id: &str) -> Result<Vec<Record>> {
        Ok(self.state.lock().await.records_for_client(client_id))
    }

    async fn set_connection(&self, api_url: &str, api_key: &str) -> Result<()> {
        let mut doc = self.state.lock().await;
        doc.settings.api_url = api_url.to_string();
        doc.settings.api_key = api_key.to_string();
        Ok(())
    }

    async fn update_api_url(&self, api_url: &str) -> Result<()> {
        self.state.lock().await.settings.api_url = api_url.to_string();
        Ok(())
    }

    async fn update_api_key(&self, api_key: &str) -> Result<()> {
        self.state.lock().await.settings.api_key = api_key.to_string();
        Ok(())
    }

    async fn set_gender_filter(&self, gender: Gender) -> Result<()> {
        self.state.lock().await.settings.gender_filter = gender;
        Ok(())
    }

    async fn start_session(&self, client_id: &str) -> Result<Option<Client>> {
        let mut doc = self.state.lock().await;
        Ok(mutations::start_session(&mut doc, client_id))
    }

    async fn end_session(&self) -> Result<()> {
        let mut doc = self.state.lock().await;
        mutations::end_session(&mut doc);
        Ok(())
    }

    async fn set_last_sync(&self, timestamp: i64) -> Result<()> {
        self.state.lock().await.settings.last_sync = timestamp;
        Ok(())
    }

    async fn apply_remote_document(
        &self,
        remote: TrackerDocument,
        server_timestamp: Option<i64>,
    ) -> Result<()> {
        let mut doc = self.state.lock().await;
        mutations::apply_remote(&mut doc, remote, server_timestamp, now_millis());
        Ok(())
    }

    async fn restore_backup(&self, incoming: TrackerDocument) -> Result<()> {
        let mut doc = self.state.lock().await;
        mutations::restore_backup(&mut doc, incoming);
        Ok(())
    }

    async fn import_clients(&self, rows: Vec<ClientInput>) -> Result<usize> {
        let mut doc = self.state.lock().await;
        Ok(mutations::import_clients(&mut doc, rows))
    }

    async fn import_exercises(&self, rows: Vec<ExerciseInput>) -> Result<usize> {
        let mut doc = self.state.lock().await;
        Ok(mutations::import_exercises(&mut doc, rows))
    }

    async fn clear_all(&self) -> Result<()> {
        let mut doc = self.state.lock().await;
        mutations::clear_all(&mut doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::Category;

    #[tokio::test]
    async fn mutations_are_visible_in_later_snapshots() {
        let store = MemoryStore::new();
        let client = store
            .upsert_client(ClientInput {
                id: None,
                name: "Ana".to_string(),
                gender: Gender::Female,
                is_trainer: false,
            })
            .await
            .unwrap()
            .unwrap();
        let exercise = store
            .upsert_exercise(ExerciseInput {
                id: None,
                name: "Squat".to_string(),
                category: Category::Legs,
            })
            .await
            .unwrap()
            .unwrap();

        let outcome = store
            .save_record(&client.id, &exercise.id, 80.0, 5)
            .await
            .unwrap();
        assert!(outcome.saved());

        let doc = store.snapshot().await.unwrap();
        assert_eq!(doc.records.len(), 1);
        assert!(doc.records[0].updated_at > 0);
        assert_eq!(
            store.records_for_client(&client.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn snapshot_is_a_copy_not_a_view() {
        let store = MemoryStore::new();
        let mut doc = store.snapshot().await.unwrap();
        doc.settings.api_key = "scribble".to_string();
        assert_eq!(store.settings().await.unwrap().api_key, "");
    }
}
