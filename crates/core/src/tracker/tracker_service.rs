//! One front door for the application.
//!
//! The service owns the push policy: roster and record mutations queue an
//! upload (the mutation itself never waits on the network), while settings,
//! session mode, and backup restores stay local until the next full
//! exchange. Callers never talk to the transport directly.

use std::sync::Arc;

use tokio::sync::watch;

use crate::clients::{Client, ClientInput, Gender};
use crate::document::{Settings, TrackerDocument, TrackerStore};
use crate::errors::Result;
use crate::exercises::{Category, Exercise, ExerciseInput};
use crate::import_export;
use crate::leaderboard::{rankings_for_exercise, top_lifts, LeaderboardEntry, LEADERBOARD_MAX};
use crate::records::{Record, SaveOutcome};
use crate::sync::{SyncOutcome, SyncReconciler, SyncStatus, SyncTransport};

pub struct TrackerService {
    store: Arc<dyn TrackerStore>,
    transport: Arc<dyn SyncTransport>,
    reconciler: Arc<SyncReconciler>,
}

impl TrackerService {
    pub fn new(store: Arc<dyn TrackerStore>, transport: Arc<dyn SyncTransport>) -> Self {
        let reconciler = Arc::new(SyncReconciler::new(
            Arc::clone(&store),
            Arc::clone(&transport),
        ));
        Self {
            store,
            transport,
            reconciler,
        }
    }

    /// Begin background operation. Harmless before a server connection is
    /// configured; timer cycles skip until one exists.
    pub async fn start(&self) {
        self.reconciler.start().await;
        // Pick up whatever other devices pushed while this one was closed.
        self.reconciler.schedule_sync();
    }

    pub async fn shutdown(&self) {
        self.reconciler.stop().await;
    }

    // ---- roster -----------------------------------------------------

    pub async fn list_clients(&self, gender: Option<Gender>) -> Result<Vec<Client>> {
        self.store.list_clients(gender).await
    }

    pub async fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        self.store.get_client(client_id).await
    }

    pub async fn save_client(&self, input: ClientInput) -> Result<Option<Client>> {
        let saved = self.store.upsert_client(input).await?;
        self.reconciler.schedule_push();
        Ok(saved)
    }

    pub async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let removed = self.store.delete_client(client_id).await?;
        self.reconciler.schedule_push();
        Ok(removed)
    }

    pub async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        self.store.list_exercises().await
    }

    pub async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        self.store.get_exercise(exercise_id).await
    }

    pub async fn save_exercise(&self, input: ExerciseInput) -> Result<Option<Exercise>> {
        let saved = self.store.upsert_exercise(input).await?;
        self.reconciler.schedule_push();
        Ok(saved)
    }

    pub async fn delete_exercise(&self, exercise_id: &str) -> Result<bool> {
        let removed = self.store.delete_exercise(exercise_id).await?;
        self.reconciler.schedule_push();
        Ok(removed)
    }

    // ---- records ----------------------------------------------------

    /// Attempt a lift. Queues an upload only when the attempt actually
    /// landed; rejections leave both the document and the server untouched.
    pub async fn save_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<SaveOutcome> {
        let outcome = self
            .store
            .save_record(client_id, exercise_id, weight, reps)
            .await?;
        if outcome.saved() {
            self.reconciler.schedule_push();
        }
        Ok(outcome)
    }

    /// Trainer override after a rejected attempt: write the values as
    /// given, policy not consulted.
    pub async fn force_update_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<Record> {
        let record = self
            .store
            .force_update_record(client_id, exercise_id, weight, reps)
            .await?;
        self.reconciler.schedule_push();
        Ok(record)
    }

    pub async fn client_records(&self, client_id: &str) -> Result<Vec<Record>> {
        self.store.records_for_client(client_id).await
    }

    // ---- views ------------------------------------------------------

    /// The gym-wall leaderboard for the currently selected gender filter.
    pub async fn leaderboard(&self, category: Option<Category>) -> Result<Vec<LeaderboardEntry>> {
        let doc = self.store.snapshot().await?;
        Ok(top_lifts(
            &doc,
            doc.settings.gender_filter,
            category,
            LEADERBOARD_MAX,
        ))
    }

    pub async fn exercise_rankings(
        &self,
        exercise_id: &str,
        gender: Option<Gender>,
    ) -> Result<Vec<Record>> {
        let doc = self.store.snapshot().await?;
        Ok(rankings_for_exercise(&doc, exercise_id, gender))
    }

    // ---- import / export --------------------------------------------

    pub async fn export_clients_csv(&self) -> Result<String> {
        Ok(import_export::clients_to_csv(
            &self.store.list_clients(None).await?,
        ))
    }

    pub async fn import_clients_csv(&self, text: &str) -> Result<usize> {
        let rows = import_export::clients_from_csv(text)?;
        let applied = self.store.import_clients(rows).await?;
        self.reconciler.schedule_push();
        Ok(applied)
    }

    pub async fn export_exercises_csv(&self) -> Result<String> {
        Ok(import_export::exercises_to_csv(
            &self.store.list_exercises().await?,
        ))
    }

    pub async fn import_exercises_csv(&self, text: &str) -> Result<usize> {
        let rows = import_export::exercises_from_csv(text)?;
        let applied = self.store.import_exercises(rows).await?;
        self.reconciler.schedule_push();
        Ok(applied)
    }

    pub async fn export_backup(&self) -> Result<String> {
        import_export::export_backup(&self.store.snapshot().await?)
    }

    /// Restore from a backup file. Deliberately not uploaded: the owner
    /// reviews the restored state and the next exchange reconciles it.
    pub async fn import_backup(&self, text: &str) -> Result<()> {
        let incoming = import_export::parse_backup(text)?;
        self.store.restore_backup(incoming).await
    }

    // ---- settings and session mode ----------------------------------

    pub async fn settings(&self) -> Result<Settings> {
        self.store.settings().await
    }

    pub async fn snapshot(&self) -> Result<TrackerDocument> {
        self.store.snapshot().await
    }

    pub async fn update_api_url(&self, api_url: &str) -> Result<()> {
        self.store.update_api_url(api_url.trim()).await
    }

    pub async fn update_api_key(&self, api_key: &str) -> Result<()> {
        self.store.update_api_key(api_key.trim()).await
    }

    pub async fn set_gender_filter(&self, gender: Gender) -> Result<()> {
        self.store.set_gender_filter(gender).await
    }

    /// Hand the device to one athlete; the leaderboard filter follows
    /// their gender for the duration.
    pub async fn start_session(&self, client_id: &str) -> Result<Option<Client>> {
        self.store.start_session(client_id).await
    }

    pub async fn end_session(&self) -> Result<()> {
        self.store.end_session().await
    }

    /// Factory reset, server credentials included. Nothing is uploaded;
    /// the server copy survives until another device pushes over it.
    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear_all().await
    }

    // ---- sync -------------------------------------------------------

    /// Validate a key against a server, and only on success store the
    /// connection, start the timer, and queue the first exchange. A failed
    /// validation changes nothing.
    pub async fn connect(&self, api_url: &str, api_key: &str) -> Result<bool> {
        let api_url = api_url.trim();
        let api_key = api_key.trim();
        let valid = matches!(self.transport.validate(api_url, api_key).await, Ok(true));
        if !valid {
            return Ok(false);
        }
        self.store.set_connection(api_url, api_key).await?;
        self.reconciler.start().await;
        self.reconciler.schedule_sync();
        Ok(true)
    }

    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.reconciler.sync_now().await
    }

    pub async fn set_online(&self) -> Result<SyncOutcome> {
        self.reconciler.set_online().await
    }

    pub fn set_offline(&self) {
        self.reconciler.set_offline();
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.reconciler.status()
    }

    pub fn subscribe_sync(&self) -> watch::Receiver<SyncStatus> {
        self.reconciler.subscribe()
    }

    pub fn is_sync_pending(&self) -> bool {
        self.reconciler.is_pending()
    }
}
