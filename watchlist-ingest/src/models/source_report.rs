//! Per-source accounting produced by the orchestrator

use serde::{Deserialize, Serialize};

/// Adapter result shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Bulk,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Adapter key (`RUN_<CODE>_LIST`)
    pub key: String,
    /// `None` when the adapter failed before declaring its mode
    pub mode: Option<SourceMode>,
    /// Raw records seen (bulk collection size, or sum of streamed batches)
    pub records: usize,
    /// Streamed batches consumed (1 for a non-empty bulk result)
    pub batches: usize,
    /// Largest single batch held in memory
    pub largest_batch: usize,
    /// Records inserted by streaming batches processed inside the adapter task
    pub streamed_new: usize,
    /// Failure detail; the source then contributes whatever it produced before failing
    pub failure: Option<String>,
}

impl SourceReport {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: None,
            records: 0,
            batches: 0,
            largest_batch: 0,
            streamed_new: 0,
            failure: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Account for one batch of `size` records
    pub fn record_batch(&mut self, size: usize) {
        self.records += size;
        self.batches += 1;
        self.largest_batch = self.largest_batch.max(size);
    }

    pub fn display_string(&self) -> String {
        let mode = match self.mode {
            Some(SourceMode::Bulk) => "bulk",
            Some(SourceMode::Streaming) => "streaming",
            None => "n/a",
        };
        match &self.failure {
            Some(reason) => format!("{} ({}): failed after {} records: {}", self.key, mode, self.records, reason),
            None => format!(
                "{} ({}): {} records in {} batches (largest {})",
                self.key, mode, self.records, self.batches, self.largest_batch
            ),
        }
    }
}
