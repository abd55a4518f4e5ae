//! File-backed source adapters
//!
//! `json` sources return the whole array as a bulk result. `jsonl` sources
//! stream newline-delimited records in batches of a configured size, so at
//! most one batch is held in memory. A malformed line is logged and skipped;
//! only a read failure ends the stream.

use crate::error::SourceError;
use crate::types::{SourceAdapter, SourceOutput};
use futures::stream;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::warn;
use watchlist_common::RawRecord;

pub const DEFAULT_STREAM_BATCH_SIZE: usize = 5000;

/// Bulk adapter over a JSON array file
pub struct JsonFileSource {
    key: String,
    path: PathBuf,
    field_map: Option<HashMap<String, String>>,
}

impl JsonFileSource {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            field_map: None,
        }
    }

    pub fn with_field_map(mut self, field_map: Option<HashMap<String, String>>) -> Self {
        self.field_map = field_map;
        self
    }
}

#[async_trait::async_trait]
impl SourceAdapter for JsonFileSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn field_map(&self) -> Option<&HashMap<String, String>> {
        self.field_map.as_ref()
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse {
                path: self.path.clone(),
                line: e.line(),
                message: e.to_string(),
            })?;

        let mut records = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<RawRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    key = %self.key,
                    path = %self.path.display(),
                    index,
                    error = %e,
                    "Skipping malformed record"
                ),
            }
        }
        tracing::debug!(key = %self.key, records = records.len(), "Loaded bulk source");
        Ok(SourceOutput::Bulk(records))
    }
}

/// Streaming adapter over a JSON-lines file
pub struct JsonlFileSource {
    key: String,
    path: PathBuf,
    batch_size: usize,
    field_map: Option<HashMap<String, String>>,
}

impl JsonlFileSource {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            batch_size: batch_size.max(1),
            field_map: None,
        }
    }

    pub fn with_field_map(mut self, field_map: Option<HashMap<String, String>>) -> Self {
        self.field_map = field_map;
        self
    }
}

struct LineCursor {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    key: String,
    line_no: usize,
    batch_size: usize,
    malformed: usize,
    done: bool,
    pending_error: Option<SourceError>,
}

impl LineCursor {
    /// Next batch, `None` at end of file or after an error was yielded
    ///
    /// Records read before a read failure are yielded first; the error
    /// follows on the next call.
    async fn next_batch(&mut self) -> Option<Result<Vec<RawRecord>, SourceError>> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    if self.malformed > 0 {
                        warn!(
                            key = %self.key,
                            path = %self.path.display(),
                            skipped = self.malformed,
                            "Finished stream with malformed lines skipped"
                        );
                    }
                    break;
                }
                Err(source) => {
                    return self.fail(batch, SourceError::Io {
                        path: self.path.clone(),
                        source,
                    });
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(&line) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    self.malformed += 1;
                    warn!(
                        key = %self.key,
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %e,
                        "Skipping malformed record"
                    );
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }

    fn fail(
        &mut self,
        batch: Vec<RawRecord>,
        error: SourceError,
    ) -> Option<Result<Vec<RawRecord>, SourceError>> {
        self.done = true;
        if batch.is_empty() {
            Some(Err(error))
        } else {
            self.pending_error = Some(error);
            Some(Ok(batch))
        }
    }
}

async fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>, SourceError> {
    let file = File::open(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file).lines())
}

#[async_trait::async_trait]
impl SourceAdapter for JsonlFileSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn field_map(&self) -> Option<&HashMap<String, String>> {
        self.field_map.as_ref()
    }

    async fn fetch(&self) -> Result<SourceOutput, SourceError> {
        let cursor = LineCursor {
            lines: open_lines(&self.path).await?,
            path: self.path.clone(),
            key: self.key.clone(),
            line_no: 0,
            batch_size: self.batch_size,
            malformed: 0,
            done: false,
            pending_error: None,
        };

        let batches = stream::unfold(cursor, |mut cursor| async move {
            cursor.next_batch().await.map(|batch| (batch, cursor))
        });
        Ok(SourceOutput::Streaming(Box::pin(batches)))
    }
}
