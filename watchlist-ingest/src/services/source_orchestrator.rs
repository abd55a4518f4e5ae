//! Source Orchestrator
//!
//! Runs every enabled adapter as its own task. Bulk results are collected
//! into the cycle's unified record set; streaming batches go straight through
//! the batch scheduler inside the adapter's task, one batch at a time.
//!
//! A failing adapter (error or panic, at invocation or mid-stream) is logged
//! and reported; siblings and the cycle carry on.

use crate::models::{SourceMode, SourceReport};
use crate::services::batch_scheduler::{BatchReport, BatchScheduler, SourcedRecord};
use crate::sources::source_code;
use crate::types::{SourceAdapter, SourceOutput};
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Everything the adapters produced for one cycle
#[derive(Debug, Default)]
pub struct OrchestrationResult {
    /// Unified record set from bulk adapters
    pub bulk: Vec<SourcedRecord>,
    /// One report per adapter, sorted by key
    pub reports: Vec<SourceReport>,
    /// Outcomes of streamed batches already processed
    pub streamed: BatchReport,
}

impl OrchestrationResult {
    /// Raw records seen across bulk and streaming adapters
    pub fn records_found(&self) -> usize {
        self.reports.iter().map(|r| r.records).sum()
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.failed())
            .map(|r| r.key.as_str())
            .collect()
    }

    /// Comma-joined keys of every adapter that ran
    pub fn source_keys(&self) -> String {
        self.reports
            .iter()
            .map(|r| r.key.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

struct AdapterResult {
    report: SourceReport,
    bulk: Vec<SourcedRecord>,
    streamed: BatchReport,
}

#[derive(Clone)]
pub struct SourceOrchestrator {
    scheduler: BatchScheduler,
}

impl SourceOrchestrator {
    pub fn new(scheduler: BatchScheduler) -> Self {
        Self { scheduler }
    }

    pub async fn run(&self, adapters: Vec<Arc<dyn SourceAdapter>>, cycle_id: &str) -> OrchestrationResult {
        let mut tasks = JoinSet::new();

        for adapter in adapters {
            let scheduler = self.scheduler.clone();
            let cycle_id = cycle_id.to_string();
            tasks.spawn(async move {
                let key = adapter.key().to_string();
                let work = AssertUnwindSafe(run_adapter(adapter, scheduler, cycle_id));
                match work.catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(source = %key, "Source adapter panicked");
                        let mut report = SourceReport::new(key);
                        report.failure = Some("adapter panicked".to_string());
                        AdapterResult {
                            report,
                            bulk: Vec::new(),
                            streamed: BatchReport::default(),
                        }
                    }
                }
            });
        }

        let mut result = OrchestrationResult::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(adapter_result) => {
                    info!(cycle_id, "{}", adapter_result.report.display_string());
                    result.bulk.extend(adapter_result.bulk);
                    result.streamed.merge(&adapter_result.streamed);
                    result.reports.push(adapter_result.report);
                }
                Err(e) => {
                    error!(cycle_id, error = %e, "Source task could not be joined");
                }
            }
        }

        result.reports.sort_by(|a, b| a.key.cmp(&b.key));
        result
    }
}

async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    scheduler: BatchScheduler,
    cycle_id: String,
) -> AdapterResult {
    let key = adapter.key().to_string();
    let code: Arc<str> = Arc::from(source_code(&key));
    let field_map = adapter.field_map().cloned().map(Arc::new);

    let mut result = AdapterResult {
        report: SourceReport::new(key.clone()),
        bulk: Vec::new(),
        streamed: BatchReport::default(),
    };

    let output = match adapter.fetch().await {
        Ok(output) => output,
        Err(e) => {
            warn!(source = %key, error = %e, "Source adapter failed");
            result.report.failure = Some(e.to_string());
            return result;
        }
    };

    match output {
        SourceOutput::Bulk(records) => {
            result.report.mode = Some(SourceMode::Bulk);
            if !records.is_empty() {
                result.report.record_batch(records.len());
            }
            result.bulk = SourcedRecord::tag_all(records, &code, field_map.as_ref());
        }
        SourceOutput::Streaming(mut batches) => {
            result.report.mode = Some(SourceMode::Streaming);
            while let Some(next) = batches.next().await {
                match next {
                    Ok(batch) => {
                        result.report.record_batch(batch.len());
                        let tagged = SourcedRecord::tag_all(batch, &code, field_map.as_ref());
                        let batch_report = scheduler.process(tagged, &cycle_id).await;
                        result.report.streamed_new += batch_report.inserted;
                        result.streamed.merge(&batch_report);
                    }
                    Err(e) => {
                        warn!(
                            source = %key,
                            records_before_failure = result.report.records,
                            error = %e,
                            "Streaming source failed mid-stream"
                        );
                        result.report.failure = Some(e.to_string());
                        break;
                    }
                }
            }
        }
    }

    result
}
