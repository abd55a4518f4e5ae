//! # Watchlist Common Library
//!
//! Shared code for the watchlist services including:
//! - Canonical record and raw record models
//! - Database initialization and schema
//! - Configuration loading and root folder resolution
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{CanonicalRecord, FamilyEdge, RawRecord, WatchType};
