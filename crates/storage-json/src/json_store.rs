//! File-backed [`TrackerStore`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use repmax_core::clients::{Client, ClientInput, Gender};
use repmax_core::document::{self, Settings, TrackerDocument, TrackerStore};
use repmax_core::exercises::{Exercise, ExerciseInput};
use repmax_core::records::{Record, SaveOutcome};
use repmax_core::{Error, Result};

pub const DATA_FILE_NAME: &str = "repmax_data.json";

/// Tracker document persisted as one JSON file.
///
/// The in-memory copy behind the mutex is authoritative; each mutation
/// updates it and rewrites the file before the lock is released, so
/// concurrent callers serialize and the file never lags a reader.
pub struct JsonTrackerStore {
    path: PathBuf,
    state: Mutex<TrackerDocument>,
}

impl JsonTrackerStore {
    /// Open the store in `data_dir`, creating the directory when needed.
    /// A missing data file is a fresh install; an unreadable one is logged
    /// and replaced with a fresh document rather than taking the whole
    /// application down.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| Error::storage(format!("create {}: {e}", data_dir.display())))?;
        let path = data_dir.join(DATA_FILE_NAME);
        let state = match fs::read(&path).await {
            Ok(bytes) => match parse_document(&bytes) {
                Ok(doc) => {
                    info!(
                        "[Storage] loaded {} ({} clients, {} records)",
                        path.display(),
                        doc.clients.len(),
                        doc.records.len()
                    );
                    doc
                }
                Err(error) => {
                    warn!(
                        "[Storage] {} is unreadable, starting fresh: {error}",
                        path.display()
                    );
                    TrackerDocument::default()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("[Storage] no data file at {}, starting fresh", path.display());
                TrackerDocument::default()
            }
            Err(error) => {
                warn!(
                    "[Storage] cannot read {}, starting fresh: {error}",
                    path.display()
                );
                TrackerDocument::default()
            }
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &TrackerDocument) -> Result<()> {
        write_atomic(&self.path, document).await
    }
}

fn parse_document(bytes: &[u8]) -> Result<TrackerDocument> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    document::migrate_to_current(value)
}

/// Write via a unique temp file in the same directory, fsync, then rename
/// over the target.
async fn write_atomic(path: &Path, document: &TrackerDocument) -> Result<()> {
    let payload = serde_json::to_vec_pretty(document)?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{DATA_FILE_NAME}.{nanos}.tmp"));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .await
        .map_err(|e| Error::storage(format!("create {}: {e}", tmp.display())))?;

    let written = async {
        file.write_all(&payload).await?;
        file.sync_all().await?;
        Ok::<(), std::io::Error>(())
    }
    .await;
    drop(file);

    if let Err(error) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(Error::storage(format!(
            "write {}: {error}",
            tmp.display()
        )));
    }

    fs::rename(&tmp, path).await.map_err(|e| {
        Error::storage(format!(
            "rename {} -> {}: {e}",
            tmp.display(),
            path.display()
        ))
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl TrackerStore for JsonTrackerStore {
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
        let saved = document::upsert_client(&mut doc, input);
        self.persist(&doc).await?;
        Ok(saved)
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool> {
        let mut doc = self.state.lock().await;
        let removed = document::delete_client(&mut doc, client_id);
        self.persist(&doc).await?;
        Ok(removed)
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        Ok(self.state.lock().await.exercises_sorted())
    }

    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        Ok(self.state.lock().await.exercise(exercise_id).cloned())
    }

    async fn upsert_exercise(&self, input: ExerciseInput) -> Result<Option<Exercise>> {
        let mut doc = self.state.lock().await;
        let saved = document::upsert_exercise(&mut doc, input);
        self.persist(&doc).await?;
        Ok(saved)
    }

    async fn delete_exercise(&self, exercise_id: &str) -> Result<bool> {
        let mut doc = self.state.lock().await;
        let removed = document::delete_exercise(&mut doc, exercise_id);
        self.persist(&doc).await?;
        Ok(removed)
    }

    async fn save_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<SaveOutcome> {
        let mut doc = self.state.lock().await;
        let outcome =
            document::save_record(&mut doc, client_id, exercise_id, weight, reps, now_millis())?;
        // Rejections leave the document untouched, so skip the rewrite.
        if outcome.saved() {
            self.persist(&doc).await?;
        }
        Ok(outcome)
    }

    async fn force_update_record(
        &self,
        client_id: &str,
        exercise_id: &str,
        weight: f64,
        reps: u32,
    ) -> Result<Record> {
        let mut doc = self.state.lock().await;
        let record = document::force_update_record(
            &mut doc,
            client_id,
            exercise_id,
            weight,
            reps,
            now_millis(),
        )?;
        self.persist(&doc).await?;
        Ok(record)
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
        self.persist(&doc).await
    }

    async fn update_api_url(&self, api_url: &str) -> Result<()> {
        let mut doc = self.state.lock().await;
        doc.settings.api_url = api_url.to_string();
        self.persist(&doc).await
    }

    async fn update_api_key(&self, api_key: &str) -> Result<()> {
        let mut doc = self.state.lock().await;
        doc.settings.api_key = api_key.to_string();
        self.persist(&doc).await
    }

    async fn set_gender_filter(&self, gender: Gender) -> Result<()> {
        let mut doc = self.state.lock().await;
        doc.settings.gender_filter = gender;
        self.persist(&doc).await
    }

    async fn start_session(&self, client_id: &str) -> Result<Option<Client>> {
        let mut doc = self.state.lock().await;
        let client = document::start_session(&mut doc, client_id);
        if client.is_some() {
            self.persist(&doc).await?;
        }
        Ok(client)
    }

    async fn end_session(&self) -> Result<()> {
        let mut doc = self.state.lock().await;
        document::end_session(&mut doc);
        self.persist(&doc).await
    }

    async fn set_last_sync(&self, timestamp: i64) -> Result<()> {
        let mut doc = self.state.lock().await;
        doc.settings.last_sync = timestamp;
        self.persist(&doc).await
    }

    async fn apply_remote_document(
        &self,
        remote: TrackerDocument,
        server_timestamp: Option<i64>,
    ) -> Result<()> {
        let mut doc = self.state.lock().await;
        document::apply_remote(&mut doc, remote, server_timestamp, now_millis());
        self.persist(&doc).await
    }

    async fn restore_backup(&self, incoming: TrackerDocument) -> Result<()> {
        let mut doc = self.state.lock().await;
        document::restore_backup(&mut doc, incoming);
        self.persist(&doc).await
    }

    async fn import_clients(&self, rows: Vec<ClientInput>) -> Result<usize> {
        let mut doc = self.state.lock().await;
        let applied = document::import_clients(&mut doc, rows);
        self.persist(&doc).await?;
        Ok(applied)
    }

    async fn import_exercises(&self, rows: Vec<ExerciseInput>) -> Result<usize> {
        let mut doc = self.state.lock().await;
        let applied = document::import_exercises(&mut doc, rows);
        self.persist(&doc).await?;
        Ok(applied)
    }

    async fn clear_all(&self) -> Result<()> {
        let mut doc = self.state.lock().await;
        document::clear_all(&mut doc);
        self.persist(&doc).await
    }
}
