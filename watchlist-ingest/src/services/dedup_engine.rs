//! Deduplication & Staging Engine
//!
//! A candidate is inserted into the canonical store with a single atomic
//! insert-if-absent, then mirrored into staging under the current cycle id.
//! Existing identifiers are skipped as duplicates.

use crate::models::{IngestOutcome, SkipReason};
use crate::types::{CanonicalStore, StagingStore};
use std::sync::Arc;
use tracing::{debug, error};
use watchlist_common::{CanonicalRecord, Result};

#[derive(Clone)]
pub struct DedupEngine {
    canonical: Arc<dyn CanonicalStore>,
    staging: Arc<dyn StagingStore>,
}

impl DedupEngine {
    pub fn new(canonical: Arc<dyn CanonicalStore>, staging: Arc<dyn StagingStore>) -> Self {
        Self { canonical, staging }
    }

    pub fn canonical(&self) -> &Arc<dyn CanonicalStore> {
        &self.canonical
    }

    pub fn staging(&self) -> &Arc<dyn StagingStore> {
        &self.staging
    }

    /// Insert a normalized candidate unless its identifier already exists
    ///
    /// Only canonical store failures are returned as errors. A staging
    /// failure after a successful canonical insert is logged and the record
    /// still counts as new.
    pub async fn ingest(&self, record: &CanonicalRecord, cycle_id: &str) -> Result<IngestOutcome> {
        if record.watchlist_id.trim().is_empty() {
            return Ok(IngestOutcome::Skipped {
                watchlist_id: None,
                reason: SkipReason::MissingIdentifier,
            });
        }

        if !self.canonical.insert_if_absent(record).await? {
            debug!(watchlist_id = %record.watchlist_id, "Duplicate identifier, skipping");
            return Ok(IngestOutcome::Skipped {
                watchlist_id: Some(record.watchlist_id.clone()),
                reason: SkipReason::DuplicateIdentifier,
            });
        }

        if let Err(e) = self.staging.insert(record, cycle_id).await {
            error!(
                watchlist_id = %record.watchlist_id,
                source = %record.source,
                cycle_id,
                error = %e,
                "Canonical insert succeeded but staging mirror failed"
            );
        }

        Ok(IngestOutcome::New {
            watchlist_id: record.watchlist_id.clone(),
            source: record.source.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteCanonicalStore, SqliteStagingStore};
    use watchlist_common::db::init_memory_database;

    async fn engine() -> DedupEngine {
        let pool = init_memory_database().await.unwrap();
        DedupEngine::new(
            Arc::new(SqliteCanonicalStore::new(pool.clone())),
            Arc::new(SqliteStagingStore::new(pool)),
        )
    }

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            watchlist_id: id.to_string(),
            full_name: "John Smith".to_string(),
            source: "UN".to_string(),
            language: "en".to_string(),
            operator: "BOT".to_string(),
            record_date: "20240101".to_string(),
            record_time: "000000".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_then_duplicate() {
        let engine = engine().await;
        let first = engine.ingest(&record("JOHN-980"), "c1").await.unwrap();
        let second = engine.ingest(&record("JOHN-980"), "c1").await.unwrap();

        assert!(first.is_new());
        assert_eq!(
            second,
            IngestOutcome::Skipped {
                watchlist_id: Some("JOHN-980".to_string()),
                reason: SkipReason::DuplicateIdentifier,
            }
        );
        assert_eq!(engine.staging().count(Some("c1")).await.unwrap(), 1);
        assert_eq!(engine.canonical().count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_identifier_is_skipped() {
        let engine = engine().await;
        let outcome = engine.ingest(&record("  "), "c1").await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Skipped {
                watchlist_id: None,
                reason: SkipReason::MissingIdentifier,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_insert_once() {
        let pool = init_memory_database().await.unwrap();
        let engine = DedupEngine::new(
            Arc::new(SqliteCanonicalStore::new(pool.clone())),
            Arc::new(SqliteStagingStore::new(pool)),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.ingest(&record("JOHN-980"), "c1").await.unwrap() })
            })
            .collect();

        let mut new_count = 0;
        for handle in handles {
            if handle.await.unwrap().is_new() {
                new_count += 1;
            }
        }
        assert_eq!(new_count, 1);
    }
}
