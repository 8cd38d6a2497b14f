//! Periodic purge of expired snapshot items.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::persistence::SnapshotStore;

/// Spawns a task that purges expired items every `every`.
///
/// The task runs until aborted.
#[must_use]
pub fn spawn_expiry_sweeper(store: Arc<dyn SnapshotStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(store.as_ref(), Utc::now()).await;
        }
    })
}

/// Purges items expired at `now`, logging the result. Store failures are
/// logged and reported as zero removals.
pub async fn sweep_once(store: &dyn SnapshotStore, now: DateTime<Utc>) -> u64 {
    match store.purge_expired(now).await {
        Ok(0) => {
            tracing::debug!("no expired snapshots");
            0
        }
        Ok(removed) => {
            tracing::info!(removed, "purged expired snapshots");
            removed
        }
        Err(err) => {
            tracing::warn!(error = %err, "expiry sweep failed");
            0
        }
    }
}
