//! In-process snapshot store.
//!
//! Used when PostgreSQL persistence is switched off, and by tests. Items
//! are held in their stored representation so reads exercise the same
//! decoding path as the database backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{SnapshotStore, StoredSnapshot};
use crate::domain::Snapshot;
use crate::domain::snapshot::PARTITION_KEY;
use crate::error::PersistError;

/// Snapshot store backed by an ordered map keyed by (`pk`, `sk`).
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<(String, String), StoredSnapshot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items held, expired or not.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns `true` if the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn put(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let item = StoredSnapshot::from_snapshot(snapshot)?;
        let key = (item.pk.clone(), item.sk.clone());
        self.items.write().await.insert(key, item);
        Ok(())
    }

    async fn recent(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Snapshot>, PersistError> {
        let items = self.items.read().await;
        items
            .values()
            .rev()
            .filter(|item| item.pk == PARTITION_KEY && !item.is_expired(now))
            .take(limit)
            .cloned()
            .map(StoredSnapshot::into_snapshot)
            .collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, PersistError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, item| !item.is_expired(now));
        Ok(u64::try_from(before - items.len()).unwrap_or(u64::MAX))
    }
}
