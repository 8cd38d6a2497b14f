//! PostgreSQL implementation of the snapshot store.
//!
//! PostgreSQL has no native item TTL, so expiry is emulated: reads skip
//! rows whose `ttl` has passed and [`SnapshotStore::purge_expired`] deletes
//! them (driven periodically by the expiry sweeper).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{SnapshotStore, StoredSnapshot};
use crate::config::MonitorConfig;
use crate::domain::Snapshot;
use crate::domain::snapshot::PARTITION_KEY;
use crate::error::PersistError;

type ItemRow = (String, String, String, serde_json::Value, DateTime<Utc>, i64);

/// PostgreSQL-backed snapshot store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidTableName`] unless `table` is a plain
    /// lowercase SQL identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, PersistError> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Opens a connection pool as configured and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the table name is invalid or the
    /// database cannot be reached.
    pub async fn connect(config: &MonitorConfig) -> Result<Self, PersistError> {
        validate_table_name(&config.history_table)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Self::new(pool, &config.history_table)
    }

    /// Creates the history table and its expiry index if they are missing.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError::Database`] on failure.
    pub async fn ensure_schema(&self) -> Result<(), PersistError> {
        let table = &self.table;
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                 pk TEXT NOT NULL, \
                 sk TEXT NOT NULL, \
                 item_type TEXT NOT NULL, \
                 features JSONB NOT NULL, \
                 \"timestamp\" TIMESTAMPTZ NOT NULL, \
                 ttl BIGINT NOT NULL, \
                 PRIMARY KEY (pk, sk))"
        );
        sqlx::query(&create).execute(&self.pool).await?;

        let index = format!("CREATE INDEX IF NOT EXISTS {table}_ttl_idx ON {table} (ttl)");
        sqlx::query(&index).execute(&self.pool).await?;

        tracing::info!(table, "history table ready");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    async fn put(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let item = StoredSnapshot::from_snapshot(snapshot)?;
        let sql = format!(
            "INSERT INTO {} (pk, sk, item_type, features, \"timestamp\", ttl) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (pk, sk) DO UPDATE SET \
             item_type = EXCLUDED.item_type, features = EXCLUDED.features, \
             \"timestamp\" = EXCLUDED.\"timestamp\", ttl = EXCLUDED.ttl",
            self.table
        );
        sqlx::query(&sql)
            .bind(&item.pk)
            .bind(&item.sk)
            .bind(&item.item_type)
            .bind(&item.features)
            .bind(item.timestamp)
            .bind(item.ttl)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Snapshot>, PersistError> {
        let sql = format!(
            "SELECT pk, sk, item_type, features, \"timestamp\", ttl FROM {} \
             WHERE pk = $1 AND ttl > $2 ORDER BY sk DESC LIMIT $3",
            self.table
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(PARTITION_KEY)
            .bind(now.timestamp())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(pk, sk, item_type, features, timestamp, ttl)| {
                StoredSnapshot {
                    pk,
                    sk,
                    item_type,
                    features,
                    timestamp,
                    ttl,
                }
                .into_snapshot()
            })
            .collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, PersistError> {
        let sql = format!("DELETE FROM {} WHERE ttl <= $1", self.table);
        let result = sqlx::query(&sql)
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Table names are spliced into SQL, so only `[a-z_][a-z0-9_]*` up to 63
/// bytes is accepted.
fn validate_table_name(name: &str) -> Result<(), PersistError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(PersistError::InvalidTableName(name.to_string()))
    }
}
