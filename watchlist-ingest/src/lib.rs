//! watchlist-ingest library interface
//!
//! Exposes the pipeline services and SQLite stores for the binary and for
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod types;
pub mod utils;

pub use crate::error::{NormalizeError, SourceError, TranslateError};
pub use crate::services::{CycleController, CycleReport, Pipeline};
