//! Reconciles the local document against the records server.
//!
//! One reconciler runs per process. It owns the sync status channel, the
//! online flag, and the periodic timer; every exchange and push funnels
//! through it so status transitions stay coherent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::document::TrackerStore;
use crate::errors::Result;

use super::{
    PushOutcome, ServerConnection, SyncOutcome, SyncStatus, SyncTransport, SYNC_INTERVAL_SECS,
};

pub struct SyncReconciler {
    store: Arc<dyn TrackerStore>,
    transport: Arc<dyn SyncTransport>,
    status_tx: watch::Sender<SyncStatus>,
    online: AtomicBool,
    pending: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncReconciler {
    pub fn new(store: Arc<dyn TrackerStore>, transport: Arc<dyn SyncTransport>) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            store,
            transport,
            status_tx,
            online: AtomicBool::new(true),
            pending: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    /// Watch channel mirroring every status transition, for UIs.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    /// Whether local changes are waiting for a server that last refused us.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    fn set_status(&self, status: SyncStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!("[Sync] status {previous:?} -> {status:?}");
        }
    }

    /// Terminal state for a failed attempt: the changes stay queued and
    /// the status channel never sticks at `Syncing`.
    fn mark_failed(&self) {
        self.pending.store(true, Ordering::Relaxed);
        self.set_status(SyncStatus::Offline);
    }

    /// Full exchange: offer the local document, adopt whatever newer copy
    /// the server hands back. Transport failures mark the device offline
    /// and queue the changes; they are not errors to the caller.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let settings = self.store.settings().await?;
        let Some(connection) = ServerConnection::from_settings(&settings) else {
            debug!("[Sync] no server connection configured, skipping exchange");
            return Ok(SyncOutcome::Skipped);
        };

        self.set_status(SyncStatus::Syncing);
        let document = match self.store.snapshot().await {
            Ok(document) => document,
            Err(error) => {
                self.mark_failed();
                return Err(error);
            }
        };
        let exchange = match self
            .transport
            .exchange(&connection, &document, settings.last_sync)
            .await
        {
            Ok(exchange) => exchange,
            Err(error) => {
                warn!("[Sync] exchange failed: {error}");
                self.mark_failed();
                return Ok(SyncOutcome::Failed);
            }
        };

        let outcome = match exchange.data {
            Some(remote) => {
                info!(
                    "[Sync] adopting server document: {} clients, {} exercises, {} records",
                    remote.clients.len(),
                    remote.exercises.len(),
                    remote.records.len()
                );
                if let Err(error) = self
                    .store
                    .apply_remote_document(remote, exchange.timestamp)
                    .await
                {
                    self.mark_failed();
                    return Err(error);
                }
                SyncOutcome::RemoteAdopted
            }
            None => SyncOutcome::LocalCurrent,
        };
        self.pending.store(false, Ordering::Relaxed);
        self.set_status(SyncStatus::Synced);
        Ok(outcome)
    }

    /// Upload local state after a mutation. Only an acknowledgement
    /// carrying the server's timestamp counts as delivered.
    pub async fn push_now(&self) -> Result<PushOutcome> {
        let settings = self.store.settings().await?;
        let Some(connection) = ServerConnection::from_settings(&settings) else {
            debug!("[Sync] no server connection configured, skipping push");
            return Ok(PushOutcome::Skipped);
        };

        let document = self.store.snapshot().await?;
        match self.transport.push(&connection, &document).await {
            Ok(ack) => {
                self.store.set_last_sync(ack.timestamp).await?;
                self.pending.store(false, Ordering::Relaxed);
                self.set_status(SyncStatus::Synced);
                Ok(PushOutcome::Acknowledged)
            }
            Err(error) => {
                warn!("[Sync] push failed, changes stay queued: {error}");
                self.mark_failed();
                Ok(PushOutcome::Failed)
            }
        }
    }

    /// Queue an exchange on the runtime without waiting for it to finish.
    /// Overlapping exchanges are tolerated; the last to complete wins.
    pub fn schedule_sync(self: &Arc<Self>) {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = reconciler.sync_now().await {
                warn!("[Sync] scheduled exchange failed: {error}");
            }
        });
    }

    /// Queue a push without waiting for it, so the mutation path never
    /// blocks on the network.
    pub fn schedule_push(self: &Arc<Self>) {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = reconciler.push_now().await {
                warn!("[Sync] scheduled push failed: {error}");
            }
        });
    }

    /// Mark the device online again and run an immediate exchange, which
    /// also delivers anything queued while offline.
    pub async fn set_online(&self) -> Result<SyncOutcome> {
        self.online.store(true, Ordering::Relaxed);
        info!("[Sync] connectivity restored, syncing now");
        self.sync_now().await
    }

    /// Mark the device offline. The timer keeps ticking but skips cycles
    /// until connectivity returns.
    pub fn set_offline(&self) {
        self.online.store(false, Ordering::Relaxed);
        self.set_status(SyncStatus::Offline);
    }

    /// Start the periodic exchange timer. Safe to call repeatedly; an
    /// already-running timer is left alone.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.timer.lock().await;
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                debug!("[Sync] timer already running");
                return;
            }
        }
        let reconciler = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(SYNC_INTERVAL_SECS)).await;
                if !reconciler.is_online() {
                    debug!("[Sync] offline, skipping scheduled exchange");
                    continue;
                }
                if let Err(error) = reconciler.sync_now().await {
                    warn!("[Sync] scheduled exchange failed: {error}");
                }
            }
        }));
        info!("[Sync] timer started, exchanging every {SYNC_INTERVAL_SECS}s");
    }

    /// Stop the periodic timer. In-flight work is aborted.
    pub async fn stop(&self) {
        let mut guard = self.timer.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
            info!("[Sync] timer stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{Client, ClientInput, Gender};
    use crate::document::{MemoryStore, Settings, TrackerDocument};
    use crate::errors::Error;
    use crate::exercises::{Exercise, ExerciseInput};
    use crate::records::{Record, SaveOutcome};
    use crate::sync::{PushAck, SyncExchange};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Exchange { last_sync: i64 },
        Push { records: usize },
    }

    #[derive(Default)]
    struct ScriptedTransport {
        exchanges: StdMutex<VecDeque<Result<SyncExchange>>>,
        pushes: StdMutex<VecDeque<Result<PushAck>>>,
        calls: StdMutex<Vec<Call>>,
    }

    impl ScriptedTransport {
        fn script_exchange(&self, outcome: Result<SyncExchange>) {
            self.exchanges.lock().unwrap().push_back(outcome);
        }

        fn script_push(&self, outcome: Result<PushAck>) {
            self.pushes.lock().unwrap().push_back(outcome);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SyncTransport for ScriptedTransport {
        async fn validate(&self, _api_url: &str, _api_key: &str) -> Result<bool> {
            Ok(true)
        }

        async fn exchange(
            &self,
            _connection: &ServerConnection,
            _document: &TrackerDocument,
            last_sync: i64,
        ) -> Result<SyncExchange> {
            self.calls.lock().unwrap().push(Call::Exchange { last_sync });
            self.exchanges
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SyncExchange::default()))
        }

        async fn push(
            &self,
            _connection: &ServerConnection,
            document: &TrackerDocument,
        ) -> Result<PushAck> {
            self.calls.lock().unwrap().push(Call::Push {
                records: document.records.len(),
            });
            self.pushes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PushAck { timestamp: 1 }))
        }
    }

    /// Store with a configured connection whose snapshot always fails,
    /// as when the backing file vanishes mid-session.
    struct BrokenStore;

    #[async_trait]
    impl TrackerStore for BrokenStore {
        async fn snapshot(&self) -> Result<TrackerDocument> {
            Err(Error::storage("backing file unreadable"))
        }

        async fn settings(&self) -> Result<Settings> {
            Ok(Settings {
                api_url: "https://gym.example/api".to_string(),
                api_key: "key".to_string(),
                ..Settings::default()
            })
        }

        async fn list_clients(&self, _gender: Option<Gender>) -> Result<Vec<Client>> {
            unreachable!()
        }

        async fn get_client(&self, _client_id: &str) -> Result<Option<Client>> {
            unreachable!()
        }

        async fn upsert_client(&self, _input: ClientInput) -> Result<Option<Client>> {
            unreachable!()
        }

        async fn delete_client(&self, _client_id: &str) -> Result<bool> {
            unreachable!()
        }

        async fn list_exercises(&self) -> Result<Vec<Exercise>> {
            unreachable!()
        }

        async fn get_exercise(&self, _exercise_id: &str) -> Result<Option<Exercise>> {
            unreachable!()
        }

        async fn upsert_exercise(&self, _input: ExerciseInput) -> Result<Option<Exercise>> {
            unreachable!()
        }

        async fn delete_exercise(&self, _exercise_id: &str) -> Result<bool> {
            unreachable!()
        }

        async fn save_record(
            &self,
            _client_id: &str,
            _exercise_id: &str,
            _weight: f64,
            _reps: u32,
        ) -> Result<SaveOutcome> {
            unreachable!()
        }

        async fn force_update_record(
            &self,
            _client_id: &str,
            _exercise_id: &str,
            _weight: f64,
            _reps: u32,
        ) -> Result<Record> {
            unreachable!()
        }

        async fn get_record(
            &self,
            _client_id: &str,
            _exercise_id: &str,
        ) -> Result<Option<Record>> {
            unreachable!()
        }

        async fn records_for_client(&self, _client_id: &str) -> Result<Vec<Record>> {
            unreachable!()
        }

        async fn set_connection(&self, _api_url: &str, _api_key: &str) -> Result<()> {
            unreachable!()
        }

        async fn update_api_url(&self, _api_url: &str) -> Result<()> {
            unreachable!()
        }

        async fn update_api_key(&self, _api_key: &str) -> Result<()> {
            unreachable!()
        }

        async fn set_gender_filter(&self, _gender: Gender) -> Result<()> {
            unreachable!()
        }

        async fn start_session(&self, _client_id: &str) -> Result<Option<Client>> {
            unreachable!()
        }

        async fn end_session(&self) -> Result<()> {
            unreachable!()
        }

        async fn set_last_sync(&self, _timestamp: i64) -> Result<()> {
            unreachable!()
        }

        async fn apply_remote_document(
            &self,
            _remote: TrackerDocument,
            _server_timestamp: Option<i64>,
        ) -> Result<()> {
            unreachable!()
        }

        async fn restore_backup(&self, _incoming: TrackerDocument) -> Result<()> {
            unreachable!()
        }

        async fn import_clients(&self, _rows: Vec<ClientInput>) -> Result<usize> {
            unreachable!()
        }

        async fn import_exercises(&self, _rows: Vec<ExerciseInput>) -> Result<usize> {
            unreachable!()
        }

        async fn clear_all(&self) -> Result<()> {
            unreachable!()
        }
    }

    fn connected_store() -> Arc<MemoryStore> {
        let mut doc = TrackerDocument::default();
        doc.settings.api_url = "https://gym.example/api".to_string();
        doc.settings.api_key = "key".to_string();
        doc.settings.last_sync = 100;
        Arc::new(MemoryStore::with_document(doc))
    }

    fn reconciler_with(
        store: Arc<MemoryStore>,
        transport: Arc<ScriptedTransport>,
    ) -> Arc<SyncReconciler> {
        Arc::new(SyncReconciler::new(store, transport))
    }

    #[tokio::test]
    async fn sync_without_a_connection_is_skipped() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(Arc::new(MemoryStore::new()), transport.clone());

        let outcome = reconciler.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Skipped);
        assert!(transport.calls().is_empty());
        assert_eq!(reconciler.status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn exchange_offers_the_stored_last_sync() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(connected_store(), transport.clone());

        let outcome = reconciler.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::LocalCurrent);
        assert_eq!(transport.calls(), vec![Call::Exchange { last_sync: 100 }]);
        assert_eq!(reconciler.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn local_current_leaves_last_sync_alone() {
        let store = connected_store();
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(store.clone(), transport);

        reconciler.sync_now().await.unwrap();
        assert_eq!(store.settings().await.unwrap().last_sync, 100);
    }

    #[tokio::test]
    async fn adopting_a_remote_document_keeps_local_settings() {
        let store = connected_store();
        let transport = Arc::new(ScriptedTransport::default());
        let mut remote = TrackerDocument::default();
        remote.clients.push(Client {
            id: "c1".to_string(),
            name: "Zoe".to_string(),
            gender: Gender::Female,
            is_trainer: false,
        });
        transport.script_exchange(Ok(SyncExchange {
            data: Some(remote),
            timestamp: Some(555),
        }));
        let reconciler = reconciler_with(store.clone(), transport);

        let outcome = reconciler.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::RemoteAdopted);

        let doc = store.snapshot().await.unwrap();
        assert_eq!(doc.clients.len(), 1);
        assert_eq!(doc.settings.api_key, "key");
        assert_eq!(doc.settings.last_sync, 555);
        assert_eq!(reconciler.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn transport_failure_queues_changes_and_goes_offline() {
        let store = connected_store();
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_exchange(Err(Error::transport("connection refused")));
        let reconciler = reconciler_with(store.clone(), transport.clone());

        let outcome = reconciler.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Failed);
        assert_eq!(reconciler.status(), SyncStatus::Offline);
        assert!(reconciler.is_pending());
        assert_eq!(store.settings().await.unwrap().last_sync, 100);

        // The next successful exchange clears the queue flag.
        let outcome = reconciler.sync_now().await.unwrap();
        assert_eq!(outcome, SyncOutcome::LocalCurrent);
        assert!(!reconciler.is_pending());
        assert_eq!(reconciler.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn storage_failure_during_exchange_still_lands_offline() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = SyncReconciler::new(Arc::new(BrokenStore), transport.clone());

        let result = reconciler.sync_now().await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(reconciler.status(), SyncStatus::Offline);
        assert!(reconciler.is_pending());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn push_acknowledgement_stamps_last_sync() {
        let store = connected_store();
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_push(Ok(PushAck { timestamp: 777 }));
        let reconciler = reconciler_with(store.clone(), transport.clone());

        let outcome = reconciler.push_now().await.unwrap();
        assert_eq!(outcome, PushOutcome::Acknowledged);
        assert_eq!(store.settings().await.unwrap().last_sync, 777);
        assert_eq!(reconciler.status(), SyncStatus::Synced);

        transport.script_push(Err(Error::transport("timed out")));
        let outcome = reconciler.push_now().await.unwrap();
        assert_eq!(outcome, PushOutcome::Failed);
        assert!(reconciler.is_pending());
        assert_eq!(reconciler.status(), SyncStatus::Offline);
        assert_eq!(store.settings().await.unwrap().last_sync, 777);
    }

    #[tokio::test]
    async fn push_without_a_connection_is_skipped() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(Arc::new(MemoryStore::new()), transport.clone());

        let outcome = reconciler.push_now().await.unwrap();
        assert_eq!(outcome, PushOutcome::Skipped);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn scheduled_work_runs_off_the_caller() {
        let store = connected_store();
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_push(Ok(PushAck { timestamp: 900 }));
        let reconciler = reconciler_with(store.clone(), transport.clone());

        reconciler.schedule_push();
        reconciler.schedule_sync();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&Call::Push { records: 0 }));
        assert_eq!(reconciler.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn going_offline_then_online_syncs_immediately() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(connected_store(), transport.clone());

        reconciler.set_offline();
        assert_eq!(reconciler.status(), SyncStatus::Offline);
        assert!(!reconciler.is_online());
        assert!(transport.calls().is_empty());

        let outcome = reconciler.set_online().await.unwrap();
        assert_eq!(outcome, SyncOutcome::LocalCurrent);
        assert!(reconciler.is_online());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_exchanges_on_cadence_and_stops_cleanly() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler_with(connected_store(), transport.clone());

        reconciler.start().await;
        reconciler.start().await; // second start leaves the running timer alone
        assert!(transport.calls().is_empty());

        // Let the timer task register its sleep before advancing the paused clock.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_secs(SYNC_INTERVAL_SECS)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.calls().len(), 1);

        // Offline cycles tick without touching the transport.
        reconciler.set_offline();
        tokio::time::advance(Duration::from_secs(SYNC_INTERVAL_SECS)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.calls().len(), 1);

        reconciler.set_online().await.unwrap();
        assert_eq!(transport.calls().len(), 2);

        reconciler.stop().await;
        tokio::time::advance(Duration::from_secs(SYNC_INTERVAL_SECS * 3)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.calls().len(), 2);
    }
}
