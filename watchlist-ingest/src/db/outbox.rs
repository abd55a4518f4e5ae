//! Notification outbox
//!
//! Payloads are queued for a separate delivery service instead of being
//! sent from the pipeline.

use crate::models::NotificationPayload;
use crate::types::Notifier;
use crate::utils::retry_on_lock;
use sqlx::SqlitePool;
use watchlist_common::db::DEFAULT_MAX_LOCK_WAIT_MS;
use watchlist_common::Result;

#[derive(Clone)]
pub struct SqliteOutboxNotifier {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteOutboxNotifier {
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

    /// Pending entries as `(message_code, recipients, payload)`
    pub async fn pending(&self) -> Result<Vec<(String, Vec<String>, NotificationPayload)>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT message_code, recipients, payload FROM notification_outbox WHERE status = 'pending' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(code, recipients, payload)| -> Result<_> {
                Ok((code, serde_json::from_str(&recipients)?, serde_json::from_str(&payload)?))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for SqliteOutboxNotifier {
    async fn notify(&self, payload: &NotificationPayload, recipients: &[String]) -> Result<()> {
        let recipients_json = serde_json::to_string(recipients)?;
        let payload_json = serde_json::to_string(payload)?;
        let pool = &self.pool;
        let (recipients_json, payload_json) = (recipients_json.as_str(), payload_json.as_str());

        retry_on_lock("outbox enqueue", self.max_lock_wait_ms, || async move {
            sqlx::query(
                r#"
                INSERT INTO notification_outbox (cycle_id, message_code, recipients, payload, attachment_path)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(payload.cycle_id.as_str())
            .bind(payload.message_code.as_str())
            .bind(recipients_json)
            .bind(payload_json)
            .bind(payload.attachment_path.as_deref())
            .execute(pool)
            .await?;
            Ok(())
        })
        .await?;

        tracing::info!(
            cycle_id = %payload.cycle_id,
            message_code = %payload.message_code,
            recipients = recipients.len(),
            "Notification queued"
        );
        Ok(())
    }
}
