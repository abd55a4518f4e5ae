//! Regulator descriptions, subscribers and the source registry

use crate::models::Subscriber;
use crate::types::{RegulatorDirectory, SubscriberDirectory};
use sqlx::SqlitePool;
use std::collections::HashMap;
use watchlist_common::Result;

#[derive(Clone)]
pub struct SqliteRegulatorDirectory {
    pool: SqlitePool,
}

impl SqliteRegulatorDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RegulatorDirectory for SqliteRegulatorDirectory {
    async fn descriptions(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT code, description FROM regulators")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(code, desc)| desc.map(|d| (code, d)))
            .collect())
    }
}

#[derive(Clone)]
pub struct SqliteSubscriberDirectory {
    pool: SqlitePool,
}

impl SqliteSubscriberDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    message_code: String,
    email_receivers: Option<String>,
    respondent_flag: Option<String>,
    respondent_email: Option<String>,
    investigator_flag: Option<String>,
    investigator_email: Option<String>,
    owner_flag: Option<String>,
    owner_email: Option<String>,
    next_owner_flag: Option<String>,
    next_owner_email: Option<String>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            message_code: row.message_code,
            email_receivers: row.email_receivers,
            respondent_flag: row.respondent_flag,
            respondent_email: row.respondent_email,
            investigator_flag: row.investigator_flag,
            investigator_email: row.investigator_email,
            owner_flag: row.owner_flag,
            owner_email: row.owner_email,
            next_owner_flag: row.next_owner_flag,
            next_owner_email: row.next_owner_email,
        }
    }
}

#[async_trait::async_trait]
impl SubscriberDirectory for SqliteSubscriberDirectory {
    async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT message_code, email_receivers,
                   respondent_flag, respondent_email,
                   investigator_flag, investigator_email,
                   owner_flag, owner_email,
                   next_owner_flag, next_owner_email
            FROM subscribers
            WHERE active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }
}

/// Keys enabled in the `source_registry` table
///
/// `None` when the table holds no rows at all, so that the next
/// configuration tier applies.
pub async fn load_enabled_source_keys(pool: &SqlitePool) -> Result<Option<Vec<String>>> {
    let rows: Vec<(String, bool)> = sqlx::query_as("SELECT key, enabled FROM source_registry ORDER BY key")
        .fetch_all(pool)
        .await?;
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        rows.into_iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(key, _)| key)
            .collect(),
    ))
}
