//! Pipeline services
//!
//! Each cycle flows through these in order: source orchestration, batch
//! scheduling (normalizer + dedup engine), family resolution, analytics and
//! notification planning. The cycle controller wires them together.

pub mod analytics_builder;
pub mod batch_scheduler;
pub mod cycle_controller;
pub mod dedup_engine;
pub mod family_resolver;
pub mod normalizer;
pub mod notification_planner;
pub mod source_orchestrator;
pub mod translator;

pub use analytics_builder::{build_analytics, write_totals_file, AnalyticsRow, CycleAnalytics};
pub use batch_scheduler::{
    BatchConfig, BatchErrorEntry, BatchErrorLog, BatchReport, BatchScheduler, SourcedRecord,
};
pub use cycle_controller::{CycleController, CycleReport, Pipeline};
pub use dedup_engine::DedupEngine;
pub use family_resolver::{FamilyReport, FamilyResolver};
pub use normalizer::{Normalizer, SourceContext};
pub use notification_planner::{plan_notifications, NotificationPlanner, PlannedNotification};
pub use source_orchestrator::{OrchestrationResult, SourceOrchestrator};
pub use translator::{TranslationMethod, TranslationOutcome, Translator};
