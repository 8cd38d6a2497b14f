//! Store item representation of a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventRecord, Snapshot};
use crate::error::PersistError;

/// One stored history item, keyed by (`pk`, `sk`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Partition key.
    pub pk: String,
    /// Sort key (second-precision timestamp).
    pub sk: String,
    /// Collection type tag.
    #[serde(rename = "type")]
    pub item_type: String,
    /// GeoJSON features as JSON.
    pub features: serde_json::Value,
    /// Snapshot creation time.
    pub timestamp: DateTime<Utc>,
    /// Expiry instant in epoch seconds.
    #[serde(rename = "TTL")]
    pub ttl: i64,
}

impl StoredSnapshot {
    /// Serializes a snapshot into its item representation.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encoding`] if the features cannot be encoded.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, PersistError> {
        Ok(Self {
            pk: snapshot.partition_key().to_string(),
            sk: snapshot.sort_key().to_string(),
            item_type: snapshot.collection_type().to_string(),
            features: serde_json::to_value(snapshot.records())?,
            timestamp: snapshot.created_at(),
            ttl: snapshot.expires_at(),
        })
    }

    /// Rebuilds the snapshot this item was written from.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encoding`] if `features` is not a list of
    /// GeoJSON features, or [`PersistError::InvalidItem`] if a key is empty.
    pub fn into_snapshot(self) -> Result<Snapshot, PersistError> {
        if self.pk.is_empty() || self.sk.is_empty() {
            return Err(PersistError::InvalidItem(format!(
                "missing key in item pk={:?} sk={:?}",
                self.pk, self.sk
            )));
        }
        let records: Vec<EventRecord> = serde_json::from_value(self.features)?;
        Ok(Snapshot::from_parts(
            self.pk,
            self.sk,
            self.item_type,
            records,
            self.timestamp,
            self.ttl,
        ))
    }

    /// Returns `true` once the item's TTL has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl <= now.timestamp()
    }
}
