//! Batch Scheduler
//!
//! Splits a record sequence into fixed-size chunks and runs normalization
//! plus deduplication for each chunk on a bounded worker pool. Chunks run
//! strictly one after another; within a chunk up to `max_workers` records are
//! in flight, with normalization on the blocking pool.
//!
//! Per-record failures never abort the chunk. They are logged and appended
//! to the side error log with their chunk offset and record data.

use crate::error::NormalizeError;
use crate::models::{IngestOutcome, SkipReason};
use crate::services::dedup_engine::DedupEngine;
use crate::services::normalizer::{Normalizer, SourceContext};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use watchlist_common::{CanonicalRecord, RawRecord};

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
const MAX_WORKER_CAP: usize = 32;
const WORKERS_PER_CPU: usize = 5;

/// `min(32, cpus x 5)`
pub fn default_max_workers() -> usize {
    (num_cpus::get() * WORKERS_PER_CPU).clamp(1, MAX_WORKER_CAP)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: default_max_workers(),
        }
    }
}

/// Raw record tagged with the adapter it came from
#[derive(Debug, Clone)]
pub struct SourcedRecord {
    pub raw: RawRecord,
    pub source_code: Option<Arc<str>>,
    pub field_map: Option<Arc<HashMap<String, String>>>,
}

impl SourcedRecord {
    pub fn new(raw: RawRecord) -> Self {
        Self {
            raw,
            source_code: None,
            field_map: None,
        }
    }

    /// Tag every record in a batch with the same source
    pub fn tag_all(
        records: Vec<RawRecord>,
        source_code: &Arc<str>,
        field_map: Option<&Arc<HashMap<String, String>>>,
    ) -> Vec<SourcedRecord> {
        records
            .into_iter()
            .map(|raw| SourcedRecord {
                raw,
                source_code: Some(source_code.clone()),
                field_map: field_map.cloned(),
            })
            .collect()
    }

    fn context(&self) -> SourceContext<'_> {
        SourceContext {
            source_code: self.source_code.as_deref(),
            field_map: self.field_map.as_deref(),
        }
    }
}

/// Outcome counts for one or more scheduled sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub missing_identity: usize,
    pub failed: usize,
    pub chunks: usize,
    pub largest_chunk: usize,
    pub inserted_by_source: HashMap<String, usize>,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.duplicates + self.missing_identity
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.processed += other.processed;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.missing_identity += other.missing_identity;
        self.failed += other.failed;
        self.chunks += other.chunks;
        self.largest_chunk = self.largest_chunk.max(other.largest_chunk);
        for (source, count) in &other.inserted_by_source {
            *self.inserted_by_source.entry(source.clone()).or_default() += count;
        }
    }

    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::New { source, .. } => {
                self.inserted += 1;
                *self.inserted_by_source.entry(source.clone()).or_default() += 1;
            }
            IngestOutcome::Skipped {
                reason: SkipReason::DuplicateIdentifier,
                ..
            } => self.duplicates += 1,
            IngestOutcome::Skipped {
                reason: SkipReason::MissingIdentifier,
                ..
            } => self.missing_identity += 1,
        }
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} processed in {} chunks: {} new, {} duplicate, {} without identity, {} failed",
            self.processed,
            self.chunks,
            self.inserted,
            self.duplicates,
            self.missing_identity,
            self.failed
        )
    }
}

/// Append-only JSON-lines log of per-record failures
pub struct BatchErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

/// One failed record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchErrorEntry {
    pub timestamp: String,
    pub cycle_id: String,
    pub source: Option<String>,
    pub chunk_offset: usize,
    pub record_index: usize,
    pub error: String,
    pub record: RawRecord,
}

impl BatchErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entries: &[BatchErrorEntry]) -> std::io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await
    }
}

enum RecordResult {
    Done(IngestOutcome),
    Failed(BatchErrorEntry),
}

#[derive(Clone)]
pub struct BatchScheduler {
    normalizer: Normalizer,
    engine: DedupEngine,
    config: BatchConfig,
    error_log: Option<Arc<BatchErrorLog>>,
}

impl BatchScheduler {
    pub fn new(normalizer: Normalizer, engine: DedupEngine, config: BatchConfig) -> Self {
        Self {
            normalizer,
            engine,
            config: BatchConfig {
                batch_size: config.batch_size.max(1),
                max_workers: config.max_workers.max(1),
            },
            error_log: None,
        }
    }

    pub fn with_error_log(mut self, error_log: Arc<BatchErrorLog>) -> Self {
        self.error_log = Some(error_log);
        self
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Normalize and ingest every record; chunk N+1 starts after chunk N drains
    pub async fn process(&self, records: Vec<SourcedRecord>, cycle_id: &str) -> BatchReport {
        let mut report = BatchReport::default();
        let mut remaining = records.into_iter();
        let mut chunk_offset = 0usize;

        loop {
            let chunk: Vec<SourcedRecord> = remaining.by_ref().take(self.config.batch_size).collect();
            if chunk.is_empty() {
                break;
            }
            let size = chunk.len();
            let chunk_report = self.process_chunk(chunk, chunk_offset, cycle_id).await;
            tracing::debug!(
                cycle_id,
                chunk_offset,
                size,
                inserted = chunk_report.inserted,
                "Chunk drained"
            );
            report.merge(&chunk_report);
            chunk_offset += size;
        }

        report
    }

    async fn process_chunk(
        &self,
        chunk: Vec<SourcedRecord>,
        chunk_offset: usize,
        cycle_id: &str,
    ) -> BatchReport {
        let mut report = BatchReport {
            processed: chunk.len(),
            chunks: 1,
            largest_chunk: chunk.len(),
            ..Default::default()
        };

        let results: Vec<RecordResult> = stream::iter(chunk.into_iter().enumerate())
            .map(|(index, item)| {
                let normalizer = self.normalizer.clone();
                let engine = self.engine.clone();
                let cycle_id = cycle_id.to_string();
                async move { Self::process_record(normalizer, engine, item, chunk_offset, index, cycle_id).await }
            })
            .buffer_unordered(self.config.max_workers)
            .collect()
            .await;

        let mut failures = Vec::new();
        for result in results {
            match result {
                RecordResult::Done(outcome) => report.record(&outcome),
                RecordResult::Failed(entry) => {
                    report.failed += 1;
                    failures.push(entry);
                }
            }
        }

        if let Some(log) = &self.error_log {
            if let Err(e) = log.append(&failures).await {
                tracing::error!(
                    path = %log.path().display(),
                    error = %e,
                    failures = failures.len(),
                    "Failed to write batch error log"
                );
            }
        }

        report
    }

    async fn process_record(
        normalizer: Normalizer,
        engine: DedupEngine,
        item: SourcedRecord,
        chunk_offset: usize,
        index: usize,
        cycle_id: String,
    ) -> RecordResult {
        let (item, result) = normalize_blocking(item, move |item| {
            normalizer.normalize(&item.raw, item.context())
        })
        .await;

        let failure = |record: RawRecord, source: Option<String>, error: String| {
            tracing::warn!(
                cycle_id = %cycle_id,
                chunk_offset,
                record_index = index,
                source = source.as_deref().unwrap_or("-"),
                error = %error,
                "Record failed"
            );
            RecordResult::Failed(BatchErrorEntry {
                timestamp: Utc::now().to_rfc3339(),
                cycle_id: cycle_id.clone(),
                source,
                chunk_offset,
                record_index: index,
                error,
                record,
            })
        };

        let record = match result {
            Ok(record) => record,
            Err(NormalizeError::MissingIdentity(detail)) => {
                tracing::debug!(chunk_offset, record_index = index, detail = %detail, "Record has no identity");
                return RecordResult::Done(IngestOutcome::Skipped {
                    watchlist_id: None,
                    reason: SkipReason::MissingIdentifier,
                });
            }
            Err(e) => {
                let source = item.source_code.as_deref().map(str::to_string);
                return failure(item.raw, source, e.to_string());
            }
        };

        match engine.ingest(&record, &cycle_id).await {
            Ok(outcome) => RecordResult::Done(outcome),
            Err(e) => failure(item.raw, Some(record.source.clone()), e.to_string()),
        }
    }
}

/// Run `normalize` on the blocking pool; a panicking task keeps the record and its source
async fn normalize_blocking<F>(
    item: SourcedRecord,
    normalize: F,
) -> (SourcedRecord, Result<CanonicalRecord, NormalizeError>)
where
    F: FnOnce(&SourcedRecord) -> Result<CanonicalRecord, NormalizeError> + Send + 'static,
{
    let retained = item.clone();
    match tokio::task::spawn_blocking(move || {
        let result = normalize(&item);
        (item, result)
    })
    .await
    {
        Ok(pair) => pair,
        Err(join_error) => (
            retained,
            Err(NormalizeError::TaskFailed(join_error.to_string())),
        ),
    }
}
