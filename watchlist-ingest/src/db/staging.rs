//! Staging mirror of records inserted since process start
//!
//! Rows carry the id of the cycle that inserted them so reporting can be
//! scoped to one cycle or to the whole process lifetime.

use super::records::{bind_record, clipped_family, INSERT_STAGING};
use crate::models::FamilyFields;
use crate::types::{FamilyTarget, StagingStore};
use crate::utils::retry_on_lock;
use sqlx::SqlitePool;
use std::collections::HashMap;
use watchlist_common::db::DEFAULT_MAX_LOCK_WAIT_MS;
use watchlist_common::{CanonicalRecord, Result};

#[derive(Clone)]
pub struct SqliteStagingStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteStagingStore {
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
impl StagingStore for SqliteStagingStore {
    async fn insert(&self, record: &CanonicalRecord, cycle_id: &str) -> Result<()> {
        let pool = &self.pool;
        retry_on_lock("staging insert", self.max_lock_wait_ms, || async move {
            bind_record(sqlx::query(INSERT_STAGING.as_str()), record)
                .bind(cycle_id)
                .execute(pool)
                .await?;
            Ok(())
        })
        .await
    }

    async fn count_by_source(&self, cycle_id: Option<&str>) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) FROM watchlist_staging WHERE (? IS NULL OR cycle_id = ?) GROUP BY source",
        )
        .bind(cycle_id)
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn count(&self, cycle_id: Option<&str>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM watchlist_staging WHERE (? IS NULL OR cycle_id = ?)",
        )
        .bind(cycle_id)
        .bind(cycle_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list(&self, cycle_id: Option<&str>) -> Result<Vec<CanonicalRecord>> {
        let records = sqlx::query_as::<_, CanonicalRecord>(
            "SELECT * FROM watchlist_staging WHERE (? IS NULL OR cycle_id = ?) ORDER BY watchlist_id",
        )
        .bind(cycle_id)
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn clear(&self) -> Result<u64> {
        let pool = &self.pool;
        let result = retry_on_lock("staging clear", self.max_lock_wait_ms, || async move {
            Ok(sqlx::query("DELETE FROM watchlist_staging").execute(pool).await?)
        })
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl FamilyTarget for SqliteStagingStore {
    fn label(&self) -> &'static str {
        "watchlist_staging"
    }

    async fn apply_family(&self, watchlist_id: &str, fields: &FamilyFields) -> Result<bool> {
        let [spouse, children, parents, relative] = clipped_family(fields);
        let (spouse, children, parents, relative) =
            (spouse.as_deref(), children.as_deref(), parents.as_deref(), relative.as_deref());
        let pool = &self.pool;

        let result = retry_on_lock("staging family update", self.max_lock_wait_ms, || async move {
            Ok(sqlx::query(
                "UPDATE watchlist_staging SET spouse = ?, children = ?, parents = ?, relative = ? WHERE watchlist_id = ?",
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

#[cfg(test)]
mod tests {
    use super::*;
    use watchlist_common::db::init_memory_database;

    fn record(id: &str, source: &str) -> CanonicalRecord {
        CanonicalRecord {
            watchlist_id: id.to_string(),
            full_name: format!("Name {}", id),
            source: source.to_string(),
            language: "en".to_string(),
            operator: "BOT".to_string(),
            record_date: "20240101".to_string(),
            record_time: "120000".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_counts_are_scoped_by_cycle() {
        let store = SqliteStagingStore::new(init_memory_database().await.unwrap());
        store.insert(&record("1", "UN"), "cycle-a").await.unwrap();
        store.insert(&record("2", "UN"), "cycle-b").await.unwrap();
        store.insert(&record("3", "EU"), "cycle-b").await.unwrap();

        assert_eq!(store.count(None).await.unwrap(), 3);
        assert_eq!(store.count(Some("cycle-b")).await.unwrap(), 2);

        let per_cycle = store.count_by_source(Some("cycle-b")).await.unwrap();
        assert_eq!(per_cycle["UN"], 1);
        assert_eq!(per_cycle["EU"], 1);

        let all = store.count_by_source(None).await.unwrap();
        assert_eq!(all["UN"], 2);

        assert_eq!(store.list(Some("cycle-a")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_staging() {
        let store = SqliteStagingStore::new(init_memory_database().await.unwrap());
        store.insert(&record("1", "UN"), "c").await.unwrap();
        store.insert(&record("2", "UN"), "c").await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_apply_family_to_staged_row() {
        let store = SqliteStagingStore::new(init_memory_database().await.unwrap());
        store.insert(&record("1", "UN"), "c").await.unwrap();

        let fields = FamilyFields {
            children: Some("Kid One, Kid Two".to_string()),
            ..Default::default()
        };
        assert!(store.apply_family("1", &fields).await.unwrap());
        let staged = store.list(None).await.unwrap();
        assert_eq!(staged[0].children.as_deref(), Some("Kid One, Kid Two"));
    }

    #[tokio::test]
    async fn test_apply_family_waits_out_a_held_write_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = watchlist_common::db::init_database(&dir.path().join("watchlist.db"))
            .await
            .unwrap();
        let store = SqliteStagingStore::new(pool.clone()).with_lock_wait(5000);
        store.insert(&record("1", "UN"), "c").await.unwrap();

        let mut holder = pool.acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(600)).await;
            sqlx::query("COMMIT").execute(&mut *holder).await.unwrap();
        });

        let fields = FamilyFields {
            spouse: Some("Jane Roe".to_string()),
            ..Default::default()
        };
        assert!(store.apply_family("1", &fields).await.unwrap());
        release.await.unwrap();

        let staged = store.list(None).await.unwrap();
        assert_eq!(staged[0].spouse.as_deref(), Some("Jane Roe"));
    }
}
