//! Database initialization against on-disk files

use tempfile::TempDir;
use watchlist_common::db::init::{init_database, load_setting, MAX_LOCK_WAIT_SETTING};

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("watchlist.db");
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_existing_database_reopens_with_data() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("watchlist.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("INSERT INTO regulators (code, description) VALUES ('UN', 'United Nations')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let description: String =
        sqlx::query_scalar("SELECT description FROM regulators WHERE code = 'UN'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(description, "United Nations");
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("watchlist.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let wait: Option<u64> = load_setting(&pool, MAX_LOCK_WAIT_SETTING).await.unwrap();
    assert!(wait.is_some());
}
