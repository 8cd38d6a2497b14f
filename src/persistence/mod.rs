//! Persistence layer: time-ordered snapshot history with expiry.
//!
//! [`SnapshotStore`] is a key/sort-key store of [`StoredSnapshot`] items.
//! Every item carries a TTL; expired items are never returned and are
//! removed by [`SnapshotStore::purge_expired`]. The concrete backends are
//! PostgreSQL via `sqlx` and an in-process map.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Snapshot;
use crate::error::PersistError;

pub use memory::MemoryStore;
pub use models::StoredSnapshot;
pub use postgres::PostgresStore;

/// Durable home of the snapshot history.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Writes the snapshot as one item keyed by (`pk`, `sk`). An existing
    /// item with the same key is replaced.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the item cannot be encoded or written.
    async fn put(&self, snapshot: &Snapshot) -> Result<(), PersistError>;

    /// Returns up to `limit` unexpired snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the store cannot be read or holds a
    /// malformed item.
    async fn recent(&self, now: DateTime<Utc>, limit: usize)
    -> Result<Vec<Snapshot>, PersistError>;

    /// Deletes every item whose TTL has passed, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] on store failure.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, PersistError>;
}
