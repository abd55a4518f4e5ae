//! Data models for the ingest pipeline

pub mod ingest_outcome;
pub mod notification;
pub mod run_summary;
pub mod source_report;

pub use ingest_outcome::{FamilyFields, IngestOutcome, SkipReason};
pub use notification::{NotificationPayload, SourceBreakdown, Subscriber};
pub use run_summary::{RunStatus, RunSummary};
pub use source_report::{SourceMode, SourceReport};
