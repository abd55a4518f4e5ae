//! Ingest run log

use crate::models::{RunStatus, RunSummary};
use crate::types::RunLog;
use crate::utils::retry_on_lock;
use sqlx::{Row, SqlitePool};
use watchlist_common::db::DEFAULT_MAX_LOCK_WAIT_MS;
use watchlist_common::Result;

#[derive(Clone)]
pub struct SqliteRunLog {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteRunLog {
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

    /// Most recent runs first
    pub async fn recent(&self, limit: i64) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT cycle_id, run_status, sources, records_processed, records_inserted,
                   previous_records, error_details, operator, last_run_date, email_status,
                   source_breakdown
            FROM ingest_runs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<RunSummary> {
                let status: String = row.try_get("run_status")?;
                let email_status: String = row.try_get("email_status")?;
                let breakdown: Option<String> = row.try_get("source_breakdown")?;
                Ok(RunSummary {
                    cycle_id: row.try_get("cycle_id")?,
                    status: if status == RunStatus::Success.as_str() {
                        RunStatus::Success
                    } else {
                        RunStatus::Error
                    },
                    sources: row.try_get("sources")?,
                    records_processed: row.try_get("records_processed")?,
                    records_inserted: row.try_get("records_inserted")?,
                    previous_records: row.try_get("previous_records")?,
                    error_details: row.try_get("error_details")?,
                    email_sent: email_status == "sent",
                    operator: row.try_get("operator")?,
                    run_at: row.try_get("last_run_date")?,
                    source_breakdown: breakdown
                        .as_deref()
                        .map(serde_json::from_str)
                        .transpose()?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RunLog for SqliteRunLog {
    async fn append(&self, summary: &RunSummary) -> Result<()> {
        let breakdown = summary
            .source_breakdown
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let notes = summary.processing_notes();
        let pool = &self.pool;
        let (breakdown, notes) = (breakdown.as_deref(), notes.as_str());

        retry_on_lock("run log append", self.max_lock_wait_ms, || async move {
            sqlx::query(
                r#"
                INSERT INTO ingest_runs (
                    cycle_id, run_status, sources, records_processed, records_inserted,
                    previous_records, error_details, processing_notes, operator,
                    last_run_date, email_status, source_breakdown
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(summary.cycle_id.as_str())
            .bind(summary.status.as_str())
            .bind(summary.sources.as_str())
            .bind(summary.records_processed)
            .bind(summary.records_inserted)
            .bind(summary.previous_records)
            .bind(summary.error_details.as_deref())
            .bind(notes)
            .bind(summary.operator.as_str())
            .bind(summary.run_at)
            .bind(summary.email_status())
            .bind(breakdown)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            cycle_id = %summary.cycle_id,
            status = summary.status.as_str(),
            "Run summary appended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use watchlist_common::db::init_memory_database;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let log = SqliteRunLog::new(init_memory_database().await.unwrap());

        let summary = RunSummary {
            cycle_id: "c1".to_string(),
            status: RunStatus::Success,
            sources: "RUN_UN_LIST,RUN_EU_LIST".to_string(),
            records_processed: 10,
            records_inserted: 4,
            previous_records: 100,
            error_details: None,
            email_sent: true,
            operator: "BOT".to_string(),
            run_at: Utc::now(),
            source_breakdown: Some(json!([{"list_name": "UN", "new_record": 4}])),
        };
        log.append(&summary).await.unwrap();
        log.append(&RunSummary::failed("c2", String::new(), "boom")).await.unwrap();

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].cycle_id, "c2");
        assert_eq!(recent[0].status, RunStatus::Error);
        assert_eq!(recent[0].records_inserted, 0);
        assert_eq!(recent[0].error_details.as_deref(), Some("boom"));

        assert_eq!(recent[1].records_inserted, 4);
        assert!(recent[1].email_sent);
        assert_eq!(recent[1].source_breakdown, summary.source_breakdown);
    }
}
