//! Live statistics over a snapshot feed.
//!
//! Every delivered snapshot replaces the previous one entirely; stats are
//! recomputed from scratch and only the latest result is kept.

use crate::analysis::compute_stats_with_precision;
use crate::models::{AggregateStats, CategorySet, Snapshot};
use futures::{pin_mut, Stream, StreamExt};
use tracing::debug;

/// Recomputes aggregate statistics for each snapshot it is fed.
pub struct LiveStats {
    categories: CategorySet,
    decimals: u32,
    latest: Option<AggregateStats>,
    deliveries: u64,
}

impl LiveStats {
    pub fn new(categories: CategorySet, decimals: u32) -> Self {
        Self {
            categories,
            decimals,
            latest: None,
            deliveries: 0,
        }
    }

    /// Replace the kept stats with those of `snapshot`.
    pub fn apply(&mut self, snapshot: &Snapshot) -> &AggregateStats {
        self.deliveries += 1;
        debug!(
            "Recomputing stats for snapshot v{} ({} records)",
            snapshot.version,
            snapshot.len()
        );

        self.latest.insert(compute_stats_with_precision(
            &snapshot.records,
            &self.categories,
            self.decimals,
        ))
    }

    /// Consume snapshots until the stream ends, handing each snapshot and its
    /// stats to `on_update`. Returns the number of snapshots processed.
    pub async fn drive<S, F>(&mut self, snapshots: S, mut on_update: F) -> u64
    where
        S: Stream<Item = Snapshot>,
        F: FnMut(&Snapshot, &AggregateStats),
    {
        pin_mut!(snapshots);

        let mut processed = 0;
        while let Some(snapshot) = snapshots.next().await {
            let stats = self.apply(&snapshot);
            on_update(&snapshot, stats);
            processed += 1;
        }

        debug!("Snapshot feed ended after {} deliveries", processed);
        processed
    }

    /// Stats of the most recent snapshot, if any arrived.
    pub fn latest(&self) -> Option<&AggregateStats> {
        self.latest.as_ref()
    }

    /// Snapshots seen over the lifetime of this instance.
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}
