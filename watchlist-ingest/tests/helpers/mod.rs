//! Test Helper Utilities
//!
//! Shared fixtures for watchlist-ingest integration tests: on-disk databases,
//! in-memory source adapters and a ready-to-run cycle controller.

#![allow(dead_code)]

use futures::stream;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use watchlist_common::config::TomlConfig;
use watchlist_common::db::init_database;
use watchlist_common::RawRecord;
use watchlist_ingest::config::{CliOverrides, IngestConfig};
use watchlist_ingest::error::SourceError;
use watchlist_ingest::sources::SourceRegistry;
use watchlist_ingest::types::{SourceAdapter, SourceOutput};
use watchlist_ingest::{CycleController, Pipeline};

/// Temporary on-disk database
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("watchlist.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

/// Controller over the SQLite pipeline with a small chunk size
pub fn create_controller(
    dir: &TempDir,
    pool: &SqlitePool,
    registry: SourceRegistry,
    toml: TomlConfig,
) -> CycleController {
    let overrides = CliOverrides {
        batch_size: Some(100),
        interval_secs: Some(1),
    };
    let config = IngestConfig::resolve(&toml, dir.path().to_path_buf(), &overrides);
    CycleController::new(
        Pipeline::sqlite(pool, 2000),
        config,
        toml,
        pool.clone(),
        registry,
    )
}

pub fn registry(adapters: Vec<Arc<dyn SourceAdapter>>) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    registry
}

pub fn person(name: &str) -> RawRecord {
    serde_json::from_value(json!({ "ricaFullName": name })).unwrap()
}

pub fn person_with_id(id: &str, name: &str) -> RawRecord {
    serde_json::from_value(json!({ "ricaWatchlistId": id, "ricaFullName": name })).unwrap()
}

/// Bulk adapter returning a fixed collection
pub struct StaticSource {
    key: String,
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(key: &str, records: Vec<RawRecord>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            key: key.to_string(),
            records,
        })
    }
}

#[async_trait::async_trait]
impl SourceAdapter for StaticSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        Ok(SourceOutput::Bulk(self.records.clone()))
    }
}

/// Streaming adapter yielding batches of the given sizes, then an optional error
pub struct BatchedSource {
    key: String,
    sizes: Vec<usize>,
    fail_after: bool,
}

impl BatchedSource {
    pub fn new(key: &str, sizes: Vec<usize>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            key: key.to_string(),
            sizes,
            fail_after: false,
        })
    }

    pub fn failing_after(key: &str, sizes: Vec<usize>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            key: key.to_string(),
            sizes,
            fail_after: true,
        })
    }
}

#[async_trait::async_trait]
impl SourceAdapter for BatchedSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        let mut batches: Vec<Result<Vec<RawRecord>, SourceError>> = Vec::new();
        let mut next_id = 0usize;
        for size in &self.sizes {
            let batch = (0..*size)
                .map(|_| {
                    next_id += 1;
                    person_with_id(&format!("{}-{}", self.key, next_id), "Stream Person")
                })
                .collect();
            batches.push(Ok(batch));
        }
        if self.fail_after {
            batches.push(Err(SourceError::Failed {
                key: self.key.clone(),
                message: "connection reset".to_string(),
            }));
        }
        Ok(SourceOutput::Streaming(Box::pin(stream::iter(batches))))
    }
}

/// Adapter whose invocation fails
pub struct BrokenSource {
    key: String,
}

impl BrokenSource {
    pub fn new(key: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            key: key.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SourceAdapter for BrokenSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        Err(SourceError::Failed {
            key: self.key.clone(),
            message: "upstream returned 503".to_string(),
        })
    }
}

/// Adapter that panics when invoked
pub struct PanickingSource {
    key: String,
}

impl PanickingSource {
    pub fn new(key: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            key: key.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SourceAdapter for PanickingSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        panic!("adapter {} exploded", self.key);
    }
}

pub async fn staging_count(pool: &SqlitePool, cycle_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_staging WHERE cycle_id = ?")
        .bind(cycle_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn canonical_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM watchlist")
        .fetch_one(pool)
        .await
        .unwrap()
}
