//! In-flight reconciliation behavior, observed through a transport whose
//! exchanges block on a semaphore until the test releases them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::clients::{ClientInput, Gender};
use crate::document::{MemoryStore, TrackerDocument, TrackerStore};
use crate::errors::{Error, Result};

use super::*;

struct GatedTransport {
    gate: Semaphore,
    exchanges: StdMutex<VecDeque<Result<SyncExchange>>>,
}

impl GatedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            exchanges: StdMutex::new(VecDeque::new()),
        })
    }

    fn script_exchange(&self, outcome: Result<SyncExchange>) {
        self.exchanges.lock().unwrap().push_back(outcome);
    }

    /// Let one blocked exchange proceed.
    fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl SyncTransport for GatedTransport {
    async fn validate(&self, _api_url: &str, _api_key: &str) -> Result<bool> {
        Ok(true)
    }

    async fn exchange(
        &self,
        _connection: &ServerConnection,
        _document: &TrackerDocument,
        _last_sync: i64,
    ) -> Result<SyncExchange> {
        self.gate.acquire().await.unwrap().forget();
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SyncExchange::default()))
    }

    async fn push(
        &self,
        _connection: &ServerConnection,
        _document: &TrackerDocument,
    ) -> Result<PushAck> {
        Ok(PushAck { timestamp: 1 })
    }
}

fn connected_store() -> Arc<MemoryStore> {
    let mut doc = TrackerDocument::default();
    doc.settings.api_url = "https://gym.example/api".to_string();
    doc.settings.api_key = "key".to_string();
    Arc::new(MemoryStore::with_document(doc))
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn subscribers_observe_each_transition_in_order() {
    let transport = GatedTransport::new();
    let reconciler = Arc::new(SyncReconciler::new(connected_store(), transport.clone()));
    let mut statuses = reconciler.subscribe();
    assert_eq!(*statuses.borrow_and_update(), SyncStatus::Idle);

    let exchange = {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move { reconciler.sync_now().await })
    };

    statuses.changed().await.unwrap();
    assert_eq!(*statuses.borrow_and_update(), SyncStatus::Syncing);

    transport.release_one();
    statuses.changed().await.unwrap();
    assert_eq!(*statuses.borrow_and_update(), SyncStatus::Synced);

    assert_eq!(exchange.await.unwrap().unwrap(), SyncOutcome::LocalCurrent);
}

#[tokio::test]
async fn a_subscriber_sees_the_degradation_to_offline() {
    let transport = GatedTransport::new();
    let reconciler = Arc::new(SyncReconciler::new(connected_store(), transport.clone()));
    let mut statuses = reconciler.subscribe();
    statuses.borrow_and_update();

    transport.script_exchange(Err(Error::transport("connection reset")));
    let exchange = {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move { reconciler.sync_now().await })
    };

    statuses.changed().await.unwrap();
    assert_eq!(*statuses.borrow_and_update(), SyncStatus::Syncing);

    transport.release_one();
    statuses.changed().await.unwrap();
    assert_eq!(*statuses.borrow_and_update(), SyncStatus::Offline);

    assert_eq!(exchange.await.unwrap().unwrap(), SyncOutcome::Failed);
    assert!(reconciler.is_pending());
}

#[tokio::test]
async fn overlapping_exchanges_are_tolerated() {
    let transport = GatedTransport::new();
    let reconciler = Arc::new(SyncReconciler::new(connected_store(), transport.clone()));

    reconciler.schedule_sync();
    reconciler.schedule_sync();
    settle().await;
    assert_eq!(reconciler.status(), SyncStatus::Syncing);

    transport.release_one();
    transport.release_one();
    settle().await;
    assert_eq!(reconciler.status(), SyncStatus::Synced);
    assert!(!reconciler.is_pending());
}

#[tokio::test]
async fn a_blocked_exchange_does_not_hold_up_local_writes() {
    let transport = GatedTransport::new();
    let store = connected_store();
    let reconciler = Arc::new(SyncReconciler::new(store.clone(), transport.clone()));

    reconciler.schedule_sync();
    settle().await;
    assert_eq!(reconciler.status(), SyncStatus::Syncing);

    // The snapshot is taken before the network call, so the store stays
    // writable while the exchange is in flight.
    let saved = store
        .upsert_client(ClientInput {
            id: None,
            name: "Ana".to_string(),
            gender: Gender::Female,
            is_trainer: false,
        })
        .await
        .unwrap();
    assert!(saved.is_some());

    transport.release_one();
    settle().await;
    assert_eq!(reconciler.status(), SyncStatus::Synced);
    assert_eq!(store.snapshot().await.unwrap().clients.len(), 1);
}
