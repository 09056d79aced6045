//! JSON-lines document store on the local filesystem.
//!
//! Each collection lives in `<data_dir>/<collection>.jsonl`, one document per
//! line, in append order. Live queries poll the file and publish a new
//! snapshot only when its content changed.

use super::{validate_collection, DocumentStore, SnapshotOrder, StoreError, Subscription};
use crate::models::{CreatedAt, NewResponse, RecordId, ResponseRecord, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default interval between change checks for live queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest interval between change checks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// File-backed document store.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    poll_interval: Duration,
}

impl FileStore {
    /// Create a store rooted at `data_dir`. The directory is created on the
    /// first append.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how often live queries check for changes, no more often than
    /// [`MIN_POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StoreError> {
        validate_collection(collection)?;
        Ok(self.data_dir.join(format!("{}.jsonl", collection)))
    }
}

/// Read every well-formed document of a collection file, in append order.
///
/// A missing file is an empty collection. Malformed lines are skipped.
async fn read_records(path: &Path) -> Result<Vec<ResponseRecord>, StoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ResponseRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                "Skipping malformed document at {}:{}: {}",
                path.display(),
                index + 1,
                e
            ),
        }
    }

    Ok(records)
}

async fn read_ordered(
    path: &Path,
    order: SnapshotOrder,
) -> Result<Vec<ResponseRecord>, StoreError> {
    let mut records = read_records(path).await?;
    order.apply(&mut records);
    Ok(records)
}

/// Poll `path` until the subscriber goes away, publishing changed content.
async fn watch_collection(
    path: PathBuf,
    order: SnapshotOrder,
    poll_interval: Duration,
    sender: watch::Sender<Snapshot>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the initial snapshot is
    // already in the channel.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = sender.closed() => break,
            _ = ticker.tick() => {}
        }

        let records = match read_ordered(&path, order).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };

        sender.send_if_modified(|current| {
            if current.records == records {
                return false;
            }
            let version = current.version + 1;
            debug!(
                "Collection file {} changed, publishing version {}",
                path.display(),
                version
            );
            *current = Snapshot::new(version, records);
            true
        });
    }

    debug!("Stopped watching {}", path.display());
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn append(
        &self,
        collection: &str,
        response: NewResponse,
    ) -> Result<RecordId, StoreError> {
        let path = self.collection_path(collection)?;
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let id = RecordId::generate();
        let record = response.into_record(id.clone(), CreatedAt::Resolved(Utc::now()));
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!("Appended response {} to {}", id, path.display());
        Ok(id)
    }

    async fn snapshot(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Snapshot, StoreError> {
        let path = self.collection_path(collection)?;
        let records = read_ordered(&path, order).await?;
        Ok(Snapshot::new(1, records))
    }

    async fn subscribe(
        &self,
        collection: &str,
        order: SnapshotOrder,
    ) -> Result<Subscription, StoreError> {
        let path = self.collection_path(collection)?;
        let records = read_ordered(&path, order).await?;
        let (sender, receiver) = watch::channel(Snapshot::new(1, records));

        let watcher = tokio::spawn(watch_collection(
            path.clone(),
            order,
            self.poll_interval,
            sender,
        ));

        debug!(
            "Watching {} every {}ms",
            path.display(),
            self.poll_interval.as_millis()
        );
        Ok(Subscription::new(collection, receiver, Some(watcher)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_response(name: &str, category: &str) -> NewResponse {
        NewResponse {
            display_name: name.to_string(),
            group: "1st Battery".to_string(),
            contact: "(11) 99999-9999".to_string(),
            category: category.to_string(),
        }
    }

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let snapshot = store
            .snapshot("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();

        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        let first = store
            .append("responses", create_test_response("Silva", "Employee"))
            .await
            .unwrap();
        let second = store
            .append("responses", create_test_response("Souza", "Own Business"))
            .await
            .unwrap();
        assert_ne!(first, second);

        let snapshot = store
            .snapshot("responses", SnapshotOrder::NewestFirst)
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.records.iter().all(|r| !r.created_at.is_pending()));
        assert_eq!(snapshot.records[0].id, second);
    }

    #[tokio::test]
    async fn test_fixture_skips_malformed_lines() {
        let store = FileStore::new(fixtures_dir());

        let snapshot = store
            .snapshot("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 5);
        assert!(snapshot.records.iter().any(|r| r.created_at.is_pending()));
        assert!(snapshot.records.iter().any(|r| r.category.is_none()));
    }

    #[tokio::test]
    async fn test_subscription_sees_appends() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).with_poll_interval(Duration::from_millis(10));

        let mut subscription = store
            .subscribe("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();
        let initial = subscription.next().await.unwrap();
        assert!(initial.is_empty());

        store
            .append("responses", create_test_response("Silva", "Employee"))
            .await
            .unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(5), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert!(updated.version > initial.version);

        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_zero_poll_interval_keeps_feed_alive() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).with_poll_interval(Duration::ZERO);
        assert_eq!(store.poll_interval, MIN_POLL_INTERVAL);

        let mut subscription = store
            .subscribe("responses", SnapshotOrder::Unordered)
            .await
            .unwrap();
        assert!(subscription.next().await.unwrap().is_empty());

        store
            .append("responses", create_test_response("Silva", "Employee"))
            .await
            .unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(5), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_collection_name() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let result = store
            .append("../outside", create_test_response("Silva", "Employee"))
            .await;

        assert!(matches!(result, Err(StoreError::InvalidCollection(_))));
    }
}
