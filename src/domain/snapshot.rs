//! One polling cycle's immutable result.
//!
//! A [`Snapshot`] is built once per scheduler cycle and then shared by
//! value (behind an `Arc`) with the broadcaster and the store. Its serde
//! form is the store item layout, which is also the `latest-update`
//! payload sent to subscribers.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::EventRecord;

/// Partition key shared by every lightning snapshot.
pub const PARTITION_KEY: &str = "FEATURE_COLLECTION";

/// Collection type tag.
pub const COLLECTION_TYPE: &str = "FeatureCollection";

/// Seconds a persisted snapshot lives before the store expires it.
pub const SNAPSHOT_TTL_SECS: i64 = 3600;

/// `chrono` format of the sort key (`YYYYMMDDTHHmmss`).
pub const SORT_KEY_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Lightning feature collection captured by one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "pk")]
    partition_key: String,
    #[serde(rename = "sk")]
    sort_key: String,
    #[serde(rename = "type")]
    collection_type: String,
    #[serde(rename = "features")]
    records: Vec<EventRecord>,
    #[serde(rename = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(rename = "TTL")]
    expires_at: i64,
}

impl Snapshot {
    /// Builds a snapshot for the given wall-clock time.
    ///
    /// `now` is truncated to millisecond precision so the ISO-8601
    /// timestamp survives a store round trip unchanged. The sort key has
    /// second precision and `expires_at` is `created_at + 3600` seconds.
    #[must_use]
    pub fn build(now: DateTime<Utc>, records: Vec<EventRecord>) -> Self {
        let created_at = now
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(now);
        Self {
            partition_key: PARTITION_KEY.to_string(),
            sort_key: created_at.format(SORT_KEY_FORMAT).to_string(),
            collection_type: COLLECTION_TYPE.to_string(),
            records,
            created_at,
            expires_at: created_at.timestamp() + SNAPSHOT_TTL_SECS,
        }
    }

    /// Reassembles a snapshot from stored attributes.
    pub(crate) fn from_parts(
        partition_key: String,
        sort_key: String,
        collection_type: String,
        records: Vec<EventRecord>,
        created_at: DateTime<Utc>,
        expires_at: i64,
    ) -> Self {
        Self {
            partition_key,
            sort_key,
            collection_type,
            records,
            created_at,
            expires_at,
        }
    }

    /// Constant discriminator for lightning feature collections.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Lexicographically sortable creation time, second precision.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    /// Constant collection type tag.
    #[must_use]
    pub fn collection_type(&self) -> &str {
        &self.collection_type
    }

    /// Records in report row order.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expiry instant in epoch seconds.
    #[must_use]
    pub const fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Returns `true` once the expiry instant has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}
