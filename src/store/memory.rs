//! In-process document store.
//!
//! Keeps collections in memory and fans snapshots out over `watch` channels.
//! Useful as a stand-in for a remote store, including its latency
//! compensation: with deferred timestamps, appends are published with a
//! pending creation time until [`MemoryStore::resolve_pending`] runs.

use super::{validate_collection, DocumentStore, SnapshotOrder, StoreError, Subscription};
use crate::models::{CreatedAt, NewResponse, RecordId, ResponseRecord, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Default)]
struct Collection {
    records: Vec<ResponseRecord>,
    version: u64,
    subscribers: Vec<(SnapshotOrder, watch::Sender<Snapshot>)>,
}

impl Collection {
    fn ordered(&self, order: SnapshotOrder) -> Vec<ResponseRecord> {
        let mut records = self.records.clone();
        order.apply(&mut records);
        records
    }

    /// Push the current member set to every live subscriber and forget the
    /// ones that went away.
    fn publish(&mut self) {
        self.version += 1;
        self.subscribers.retain(|(_, sender)| !sender.is_closed());

        let version = self.version;
        for (order, sender) in &self.subscribers {
            let mut records = self.records.clone();
            order.apply(&mut records);
            sender.send_replace(Snapshot::new(version, records));
        }
    }
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    rejecting: Option<String>,
}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    defer_timestamps: bool,
}

impl MemoryStore {
    /// A store that resolves creation times immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that leaves creation times pending until resolved.
    pub fn with_deferred_timestamps() -> Self {
        Self {
            defer_timestamps: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every following append fail with `reason`.
    pub fn reject_writes(&self, reason: impl Into<String>) {
        self.lock().rejecting = Some(reason.into());
    }

    /// Undo [`MemoryStore::reject_writes`].
    pub fn accept_writes(&self) {
        self.lock().rejecting = None;
    }

    /// Store a record exactly as given, as another writer might have.
    pub fn insert_record(&self, collection: &str, record: ResponseRecord) {
        let mut state = self.lock();
        let entry = state.collections.entry(collection.to_string()).or_default();
        entry.records.push(record);
        entry.publish();
    }

    /// Resolve every pending creation time in a collection. Returns how many
    /// records were resolved.
    pub fn resolve_pending(&self, collection: &str) -> usize {
        let mut state = self.lock();
        let Some(entry) = state.collections.get_mut(collection) else {
            return 0;
        };

        let now = Utc::now();
        let mut resolved = 0;
        for record in entry.records.iter_mut().filter(|r| r.created_at.is_pending()) {
            record.created_at = CreatedAt::Resolved(now);
            resolved += 1;
        }

        if resolved > 0 {
            debug!("Resolved {} pending timestamps in {}", resolved, collection);
            entry.publish();
        }
        resolved
    }

    /// Number of open subscriptions on a collection.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(|entry| {
                entry
                    .subscribers
                    .iter()
                    .filter(|(_, sender)| !sender.is_closed())
                    .count()
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append(
        &self,
        collection: &str,
        response: NewResponse,
    ) -> Result<RecordId, StoreError> {
        validate_collection(collection)?;

        let mut state = self.lock();
        if let Some(reason) = &state.rejecting {
            return Err(StoreError::WriteRejected(reason.clone()));
        }

        let id = RecordId::generate();
        let created_at = if self.defer_timestamps {
            CreatedAt::Pending
        } else {
            CreatedAt::Resolved(Utc::now())
        };

        let entry = state.collections.entry(collection.to_string()).or_default();
        entry.records.push(response.into_record(id.clone(), created_at));
        entry.publish();

        info!("Appended response {} to {}", id, collection);
        Ok(id)
    }

    async fn snapshot(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Snapshot, StoreError> {
        validate_collection(collection)?;

        let state = self.lock();
        Ok(match state.collections.get(collection) {
            Some(entry) => Snapshot::new(entry.version, entry.ordered(order)),
            None => Snapshot::default(),
        })
    }

    async fn subscribe(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Subscription, StoreError> {
        validate_collection(collection)?;

        let mut state = self.lock();
        let entry = state.collections.entry(collection.to_string()).or_default();
        let (sender, receiver) =
            watch::channel(Snapshot::new(entry.version, entry.ordered(order)));
        entry.subscribers.push((order, sender));

        debug!("Subscribed to collection {}", collection);
        Ok(Subscription::new(collection, receiver, None))
    }
}
