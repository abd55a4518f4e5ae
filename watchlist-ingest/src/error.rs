//! Error types for watchlist-ingest
//!
//! Store, config and I/O failures use `watchlist_common::Error`. The enums
//! below cover the three pipeline-specific failure domains; the cycle
//! controller and binary wrap everything in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Record could not be normalized into a canonical candidate
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Neither a raw identifier nor a name with word characters is present
    #[error("record has no identity: {0}")]
    MissingIdentity(String),

    /// Translation or name handling failed in the blocking pool
    #[error("normalization task failed: {0}")]
    TaskFailed(String),
}

/// Source adapter failure (at invocation or mid-stream)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Source {key} failed: {message}")]
    Failed { key: String, message: String },

    #[error("Unknown source kind for {0}")]
    Unsupported(String),
}

/// Machine translation backend failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("translation from {lang} failed: {message}")]
    Backend { lang: String, message: String },

    #[error("no translation pair {from} -> {to}")]
    UnsupportedPair { from: String, to: String },
}
