//! Trait seams between the pipeline and its collaborators
//!
//! The pipeline only talks to stores, sources, translators and notifiers
//! through these traits. SQLite implementations live in `crate::db`, file
//! sources in `crate::sources`.

use crate::error::{SourceError, TranslateError};
use crate::models::{FamilyFields, NotificationPayload, RunSummary, Subscriber};
use futures::stream::BoxStream;
use std::collections::HashMap;
use watchlist_common::{CanonicalRecord, FamilyEdge, RawRecord, Result};

// ============================================================================
// Translation
// ============================================================================

/// Machine translation engine
///
/// Called from the blocking pool, so implementations may block.
pub trait TranslationBackend: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &str;

    /// Source languages with an installed pair into `target`
    fn language_pairs(&self, target: &str) -> Vec<String>;

    /// Translate `text` from `from` into `to`
    fn translate(&self, text: &str, from: &str, to: &str) -> std::result::Result<String, TranslateError>;
}

// ============================================================================
// Sources
// ============================================================================

/// Lazy sequence of record batches from a streaming adapter
pub type RecordBatchStream = BoxStream<'static, std::result::Result<Vec<RawRecord>, SourceError>>;

/// What an adapter returns when invoked
pub enum SourceOutput {
    /// Complete collection, merged into the cycle's unified record set
    Bulk(Vec<RawRecord>),
    /// Batches processed as they arrive, never buffered together
    Streaming(RecordBatchStream),
}

/// Named provider of raw watchlist data
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Registry key (`RUN_<CODE>_LIST`)
    fn key(&self) -> &str;

    /// Optional `source field -> canonical field` mapping
    fn field_map(&self) -> Option<&HashMap<String, String>> {
        None
    }

    async fn fetch(&self) -> std::result::Result<SourceOutput, SourceError>;
}

// ============================================================================
// Stores
// ============================================================================

/// Durable deduplicated record store
#[async_trait::async_trait]
pub trait CanonicalStore: Send + Sync {
    async fn exists(&self, watchlist_id: &str) -> Result<bool>;

    /// Atomic insert-if-absent; `true` when the row was inserted
    async fn insert_if_absent(&self, record: &CanonicalRecord) -> Result<bool>;

    async fn get(&self, watchlist_id: &str) -> Result<Option<CanonicalRecord>>;

    async fn count_by_source(&self) -> Result<HashMap<String, i64>>;

    async fn count_all(&self) -> Result<i64>;

    async fn list_all(&self) -> Result<Vec<CanonicalRecord>>;

    /// `watchlist_id -> full_name` for every record
    async fn name_index(&self) -> Result<HashMap<String, String>>;
}

/// Mirror of records inserted during the process lifetime
#[async_trait::async_trait]
pub trait StagingStore: Send + Sync {
    async fn insert(&self, record: &CanonicalRecord, cycle_id: &str) -> Result<()>;

    /// Counts grouped by source; `None` counts every cycle
    async fn count_by_source(&self, cycle_id: Option<&str>) -> Result<HashMap<String, i64>>;

    async fn count(&self, cycle_id: Option<&str>) -> Result<i64>;

    async fn list(&self, cycle_id: Option<&str>) -> Result<Vec<CanonicalRecord>>;

    /// Remove every staged row; returns rows removed
    async fn clear(&self) -> Result<u64>;
}

/// Store that accepts denormalized family fields
#[async_trait::async_trait]
pub trait FamilyTarget: Send + Sync {
    /// Name used in logs
    fn label(&self) -> &'static str;

    /// Overwrite the four relationship fields; `false` if the id is absent
    async fn apply_family(&self, watchlist_id: &str, fields: &FamilyFields) -> Result<bool>;
}

/// Read-only relationship edges
#[async_trait::async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn edges(&self) -> Result<Vec<FamilyEdge>>;
}

/// Source code to human description
#[async_trait::async_trait]
pub trait RegulatorDirectory: Send + Sync {
    async fn descriptions(&self) -> Result<HashMap<String, String>>;
}

// ============================================================================
// Reporting
// ============================================================================

#[async_trait::async_trait]
pub trait RunLog: Send + Sync {
    async fn append(&self, summary: &RunSummary) -> Result<()>;
}

#[async_trait::async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn subscribers(&self) -> Result<Vec<Subscriber>>;
}

/// Delivery collaborator for cycle notifications
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &NotificationPayload, recipients: &[String]) -> Result<()>;
}
