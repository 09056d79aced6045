//! Document store access.
//!
//! The store is an external collaborator: it assigns ids and creation
//! timestamps on append and pushes the full member set of a collection to
//! every subscriber whenever that set changes.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::models::{CreatedAt, NewResponse, RecordId, ResponseRecord, Snapshot};
use async_trait::async_trait;
use futures::Stream;
use std::cmp::Ordering;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors raised by store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// Collection names must be non-empty and use only ASCII letters,
    /// digits, `-` and `_`.
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Order in which snapshot records are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotOrder {
    /// Store order (append order).
    #[default]
    Unordered,
    /// Descending creation time. Pending timestamps count as newest, and
    /// later appends come first among equal timestamps.
    NewestFirst,
}

impl SnapshotOrder {
    /// Sort `records`, which must be in append order, into this order.
    pub fn apply(self, records: &mut [ResponseRecord]) {
        if self == SnapshotOrder::NewestFirst {
            records.reverse();
            records.sort_by(|a, b| newest_first(&a.created_at, &b.created_at));
        }
    }
}

fn newest_first(a: &CreatedAt, b: &CreatedAt) -> Ordering {
    match (a, b) {
        (CreatedAt::Pending, CreatedAt::Pending) => Ordering::Equal,
        (CreatedAt::Pending, CreatedAt::Resolved(_)) => Ordering::Less,
        (CreatedAt::Resolved(_), CreatedAt::Pending) => Ordering::Greater,
        (CreatedAt::Resolved(x), CreatedAt::Resolved(y)) => y.cmp(x),
    }
}

/// Check that a collection name is safe to use as a key and a file stem.
pub fn validate_collection(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

/// A document store holding survey responses.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a new response. The store assigns the id and creation time.
    async fn append(
        &self,
        collection: &str,
        response: NewResponse,
    ) -> Result<RecordId, StoreError>;

    /// Read the current member set once.
    async fn snapshot(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Snapshot, StoreError>;

    /// Open a live query over a collection.
    async fn subscribe(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Subscription, StoreError>;
}

/// A live query over one collection.
///
/// Backed by a latest-value channel: a consumer that falls behind skips
/// straight to the newest snapshot and never sees an older one after a newer
/// one. Dropping the subscription releases it.
pub struct Subscription {
    collection: String,
    receiver: watch::Receiver<Snapshot>,
    watcher: Option<JoinHandle<()>>,
    delivered_initial: bool,
}

impl Subscription {
    /// Wrap a receiver. `watcher` is a background task owned by this
    /// subscription, aborted when it is released.
    pub fn new(
        collection: impl Into<String>,
        receiver: watch::Receiver<Snapshot>,
        watcher: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            collection: collection.into(),
            receiver,
            watcher,
            delivered_initial: false,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next unseen snapshot.
    ///
    /// The first call returns the current snapshot immediately. Returns
    /// `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.delivered_initial {
            self.receiver.changed().await.ok()?;
        }
        self.delivered_initial = true;

        let snapshot = self.receiver.borrow_and_update().clone();
        Some(snapshot)
    }

    /// Adapt into a stream of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Snapshot> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|snapshot| (snapshot, subscription))
        })
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        debug!("Unsubscribed from collection {}", self.collection);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.watcher.is_some() {
            self.release();
        }
    }
}
