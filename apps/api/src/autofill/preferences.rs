//! Preference Store: learned answers keyed by (user, canonical field key).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::preference::PreferenceRow;

/// Canonical field key → last-known value for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceRecord(BTreeMap<String, String>);

impl PreferenceRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PreferenceRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<PreferenceRecord, StoreError>;

    /// Writes every non-blank entry as one atomic batch for `user_id`.
    /// Returns the number of keys written.
    async fn put_batch(
        &self,
        user_id: Uuid,
        entries: &[(String, String)],
    ) -> Result<usize, StoreError>;

    async fn put(&self, user_id: Uuid, key: &str, value: &str) -> Result<bool, StoreError> {
        let written = self
            .put_batch(user_id, &[(key.to_string(), value.to_string())])
            .await?;
        Ok(written == 1)
    }
}

/// Trims keys and values, drops blank ones, and keeps the last value per key.
pub fn writable_entries(entries: &[(String, String)]) -> BTreeMap<&str, &str> {
    entries
        .iter()
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get(&self, user_id: Uuid) -> Result<PreferenceRecord, StoreError> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM user_preferences WHERE user_id = $1 ORDER BY field_key",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.field_key, row.field_value))
            .collect())
    }

    async fn put_batch(
        &self,
        user_id: Uuid,
        entries: &[(String, String)],
    ) -> Result<usize, StoreError> {
        let entries = writable_entries(entries);
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        // Serializes concurrent batches for the same user until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (&key, &value) in &entries {
            sqlx::query(
                r#"
                INSERT INTO user_preferences (user_id, field_key, field_value)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, field_key) DO UPDATE
                SET field_value = EXCLUDED.field_value,
                    usage_count = user_preferences.usage_count + 1,
                    last_used = now()
                "#,
            )
            .bind(user_id)
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored {} preferences for user {user_id}", entries.len());
        Ok(entries.len())
    }
}
