//! Database initialization
//!
//! Opens (creating if needed) the SQLite database under the root folder and
//! creates every table idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite busy timeout applied to every pooled connection
///
/// Kept short so lock contention surfaces to `retry_on_lock`, which backs off
/// up to the `max_lock_wait_ms` setting.
pub const BUSY_TIMEOUT_MS: u64 = 250;

/// Settings key bounding total retry time on a locked database
pub const MAX_LOCK_WAIT_SETTING: &str = "max_lock_wait_ms";
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Columns shared by `watchlist` and `watchlist_staging`
const RECORD_COLUMNS: &str = r#"
            watchlist_id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            first_name TEXT,
            middle_name TEXT,
            surname TEXT,
            title TEXT,
            watch_type TEXT,
            source TEXT NOT NULL,
            category TEXT,
            sub_category TEXT,
            description TEXT,
            nationality TEXT,
            address TEXT,
            country TEXT,
            remarks TEXT,
            action_date DATE,
            date_of_birth DATE,
            flag_date DATE,
            spouse TEXT,
            children TEXT,
            parents TEXT,
            relative TEXT,
            language TEXT NOT NULL DEFAULT 'en',
            reported_by TEXT,
            operator TEXT NOT NULL DEFAULT 'BOT',
            record_date TEXT NOT NULL,
            record_time TEXT NOT NULL"#;

/// Open a pool against `db_path` and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema (single connection)
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    create_schema(&pool).await?;
    init_default_settings(&pool).await?;
    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_watchlist_table(pool).await?;
    create_staging_table(pool).await?;
    create_family_table(pool).await?;
    create_ingest_runs_table(pool).await?;
    create_regulators_table(pool).await?;
    create_subscribers_table(pool).await?;
    create_source_registry_table(pool).await?;
    create_notification_outbox_table(pool).await?;
    debug!("Schema verified");
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_watchlist_table(pool: &SqlitePool) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist ({},
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        RECORD_COLUMNS
    );
    sqlx::query(&sql).execute(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_watchlist_source ON watchlist(source)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_staging_table(pool: &SqlitePool) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist_staging ({},
            cycle_id TEXT NOT NULL,
            staged_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        RECORD_COLUMNS
    );
    sqlx::query(&sql).execute(pool).await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_staging_cycle_source ON watchlist_staging(cycle_id, source)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_family_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist_family (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id TEXT NOT NULL,
            relative_id TEXT NOT NULL,
            relationship TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_family_person ON watchlist_family(person_id)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_ingest_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cycle_id TEXT NOT NULL,
            run_status TEXT NOT NULL,
            sources TEXT NOT NULL DEFAULT '',
            records_processed INTEGER NOT NULL DEFAULT 0,
            records_inserted INTEGER NOT NULL DEFAULT 0,
            previous_records INTEGER NOT NULL DEFAULT 0,
            error_details TEXT,
            processing_notes TEXT,
            operator TEXT NOT NULL DEFAULT 'BOT',
            last_run_date TIMESTAMP NOT NULL,
            email_status TEXT NOT NULL DEFAULT 'not_sent',
            source_breakdown TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_regulators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regulators (
            code TEXT PRIMARY KEY,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_subscribers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscribers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_code TEXT NOT NULL,
            email_receivers TEXT,
            respondent_flag TEXT,
            respondent_email TEXT,
            investigator_flag TEXT,
            investigator_email TEXT,
            owner_flag TEXT,
            owner_email TEXT,
            next_owner_flag TEXT,
            next_owner_email TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_source_registry_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS source_registry (
            key TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL DEFAULT 1,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_notification_outbox_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cycle_id TEXT NOT NULL,
            message_code TEXT NOT NULL,
            recipients TEXT NOT NULL,
            payload TEXT NOT NULL,
            attachment_path TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, MAX_LOCK_WAIT_SETTING, &DEFAULT_MAX_LOCK_WAIT_MS.to_string()).await?;
    Ok(())
}

/// Insert a setting only when the key is absent
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let result = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
    }
    Ok(())
}

/// Read a setting and parse it, `None` when missing or unparsable
pub async fn load_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten().and_then(|v| v.trim().parse::<T>().ok()))
}

/// Upsert a setting
pub async fn save_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_default_settings() {
        let pool = init_memory_database().await.unwrap();
        let wait: Option<u64> = load_setting(&pool, MAX_LOCK_WAIT_SETTING).await.unwrap();
        assert_eq!(wait, Some(DEFAULT_MAX_LOCK_WAIT_MS));
    }

    #[tokio::test]
    async fn test_ensure_setting_keeps_existing_value() {
        let pool = init_memory_database().await.unwrap();
        save_setting(&pool, MAX_LOCK_WAIT_SETTING, "9000").await.unwrap();
        init_default_settings(&pool).await.unwrap();

        let wait: Option<u64> = load_setting(&pool, MAX_LOCK_WAIT_SETTING).await.unwrap();
        assert_eq!(wait, Some(9000));
    }

    #[tokio::test]
    async fn test_load_setting_unparsable_is_none() {
        let pool = init_memory_database().await.unwrap();
        save_setting(&pool, "flag", "not-a-number").await.unwrap();
        let value: Option<u32> = load_setting(&pool, "flag").await.unwrap();
        assert_eq!(value, None);
        let missing: Option<u32> = load_setting(&pool, "absent").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        for expected in [
            "ingest_runs",
            "notification_outbox",
            "regulators",
            "settings",
            "source_registry",
            "subscribers",
            "watchlist",
            "watchlist_family",
            "watchlist_staging",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
        }
    }
}
