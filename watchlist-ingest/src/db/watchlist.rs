//! Canonical watchlist table

use super::records::{bind_record, clipped_family, INSERT_CANONICAL};
use crate::models::FamilyFields;
use crate::types::{CanonicalStore, FamilyTarget};
use crate::utils::retry_on_lock;
use sqlx::SqlitePool;
use std::collections::HashMap;
use watchlist_common::db::DEFAULT_MAX_LOCK_WAIT_MS;
use watchlist_common::{CanonicalRecord, Result};

#[derive(Clone)]
pub struct SqliteCanonicalStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteCanonicalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_lock_wait(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }
}

#[async_trait::async_trait]
impl CanonicalStore for SqliteCanonicalStore {
    async fn exists(&self, watchlist_id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM watchlist WHERE watchlist_id = ?")
            .bind(watchlist_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn insert_if_absent(&self, record: &CanonicalRecord) -> Result<bool> {
        let pool = &self.pool;
        let result = retry_on_lock("canonical insert", self.max_lock_wait_ms, || async move {
            Ok(bind_record(sqlx::query(INSERT_CANONICAL.as_str()), record)
                .execute(pool)
                .await?)
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, watchlist_id: &str) -> Result<Option<CanonicalRecord>> {
        let record = sqlx::query_as::<_, CanonicalRecord>("SELECT * FROM watchlist WHERE watchlist_id = ?")
            .bind(watchlist_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn count_by_source(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM watchlist GROUP BY source")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<CanonicalRecord>> {
        let records = sqlx::query_as::<_, CanonicalRecord>("SELECT * FROM watchlist ORDER BY watchlist_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn name_index(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT watchlist_id, full_name FROM watchlist")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl FamilyTarget for SqliteCanonicalStore {
    fn label(&self) -> &'static str {
        "watchlist"
    }

    async fn apply_family(&self, watchlist_id: &str, fields: &FamilyFields) -> Result<bool> {
        let [spouse, children, parents, relative] = clipped_family(fields);
        let (spouse, children, parents, relative) =
            (spouse.as_deref(), children.as_deref(), parents.as_deref(), relative.as_deref());
        let pool = &self.pool;

        let result = retry_on_lock("canonical family update", self.max_lock_wait_ms, || async move {
            Ok(sqlx::query(
                "UPDATE watchlist SET spouse = ?, children = ?, parents = ?, relative = ? WHERE watchlist_id = ?",
            )
            .bind(spouse)
            .bind(children)
            .bind(parents)
            .bind(relative)
            .bind(watchlist_id)
            .execute(pool)
            .await?)
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
