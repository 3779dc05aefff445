use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::StoreError;

/// One row in the record store: a partition/sort key pair plus a JSON
/// attribute blob. Profile records, art pointers and cleanup queue items
/// all share this shape.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecordItem {
    pub partition_key: String,
    pub sort_key: String,
    pub attributes: serde_json::Value,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, partition_key: &str, sort_key: &str)
    -> Result<Option<RecordItem>, StoreError>;

    /// Upsert. `put` of an existing key replaces its attributes.
    async fn put(&self, item: &RecordItem) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, partition_key: &str, sort_key: &str) -> Result<(), StoreError>;

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
    ) -> Result<Vec<RecordItem>, StoreError>;

    /// Conditional write: apply `item` only if the stored row currently has
    /// a top-level `status` attribute equal to `expected`. Returns whether
    /// the write was applied. This is the compare-and-swap that keeps two
    /// concurrent queue processors from both claiming the same item.
    async fn put_if_status(&self, item: &RecordItem, expected: &str) -> Result<bool, StoreError>;
}

/// Postgres-backed record store over the single `records` table.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(
        &self,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<RecordItem>, StoreError> {
        let item = sqlx::query_as::<_, RecordItem>(
            "SELECT partition_key, sort_key, attributes FROM records
             WHERE partition_key = $1 AND sort_key = $2",
        )
        .bind(partition_key)
        .bind(sort_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn put(&self, item: &RecordItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO records (partition_key, sort_key, attributes)
             VALUES ($1, $2, $3)
             ON CONFLICT (partition_key, sort_key)
             DO UPDATE SET attributes = EXCLUDED.attributes, updated_at = now()",
        )
        .bind(&item.partition_key)
        .bind(&item.sort_key)
        .bind(&item.attributes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, partition_key: &str, sort_key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE partition_key = $1 AND sort_key = $2")
            .bind(partition_key)
            .bind(sort_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
    ) -> Result<Vec<RecordItem>, StoreError> {
        // Key segments never contain LIKE metacharacters, so a plain
        // prefix pattern is safe here.
        let items = sqlx::query_as::<_, RecordItem>(
            "SELECT partition_key, sort_key, attributes FROM records
             WHERE partition_key = $1
               AND ($2::text IS NULL OR sort_key LIKE $2 || '%')
             ORDER BY sort_key",
        )
        .bind(partition_key)
        .bind(sort_key_prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn put_if_status(&self, item: &RecordItem, expected: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE records SET attributes = $3, updated_at = now()
             WHERE partition_key = $1 AND sort_key = $2
               AND attributes ->> 'status' = $4",
        )
        .bind(&item.partition_key)
        .bind(&item.sort_key)
        .bind(&item.attributes)
        .bind(expected)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
