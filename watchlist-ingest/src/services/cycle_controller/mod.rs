//! Cycle Controller
//!
//! Drives the recurring ingest loop:
//! `SNAPSHOT → ORCHESTRATE → NORMALIZE_DEDUP_BATCH → RESOLVE_FAMILY →
//! ANALYZE → NOTIFY → LOG → SLEEP`.
//!
//! Staging is cleared once when the controller starts. A cycle that fails is
//! written to the run log with status `error` and stops the loop. The sleep
//! between cycles ends early when the cancellation token fires; a running
//! cycle always completes first.

pub mod context;

pub use context::{CycleContext, CyclePhase, SourceSnapshot};

use crate::config::{resolve_enabled_sources, IngestConfig};
use crate::db::{
    SqliteCanonicalStore, SqliteOutboxNotifier, SqliteRegulatorDirectory, SqliteRelationshipStore,
    SqliteRunLog, SqliteStagingStore, SqliteSubscriberDirectory,
};
use crate::models::{RunStatus, RunSummary, SourceReport};
use crate::services::analytics_builder::{build_analytics, write_totals_file, CycleAnalytics};
use crate::services::batch_scheduler::{BatchErrorLog, BatchReport, BatchScheduler};
use crate::services::dedup_engine::DedupEngine;
use crate::services::family_resolver::FamilyResolver;
use crate::services::normalizer::{Normalizer, BOT_OPERATOR};
use crate::services::notification_planner::NotificationPlanner;
use crate::services::source_orchestrator::SourceOrchestrator;
use crate::services::translator::Translator;
use crate::sources::SourceRegistry;
use crate::types::{
    CanonicalStore, FamilyTarget, Notifier, RegulatorDirectory, RelationshipStore, RunLog,
    StagingStore, SubscriberDirectory,
};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use watchlist_common::config::{StagingScope, TomlConfig};

/// Stores and collaborators used by every cycle
#[derive(Clone)]
pub struct Pipeline {
    pub canonical: Arc<dyn CanonicalStore>,
    pub canonical_family: Arc<dyn FamilyTarget>,
    pub staging: Arc<dyn StagingStore>,
    pub staging_family: Arc<dyn FamilyTarget>,
    pub relationships: Arc<dyn RelationshipStore>,
    pub regulators: Arc<dyn RegulatorDirectory>,
    pub run_log: Arc<dyn RunLog>,
    pub subscribers: Arc<dyn SubscriberDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<Translator>,
}

impl Pipeline {
    /// Every collaborator backed by the given SQLite pool
    pub fn sqlite(pool: &SqlitePool, max_lock_wait_ms: u64) -> Self {
        let canonical =
            Arc::new(SqliteCanonicalStore::new(pool.clone()).with_lock_wait(max_lock_wait_ms));
        let staging =
            Arc::new(SqliteStagingStore::new(pool.clone()).with_lock_wait(max_lock_wait_ms));

        Self {
            canonical_family: canonical.clone(),
            canonical,
            staging_family: staging.clone(),
            staging,
            relationships: Arc::new(SqliteRelationshipStore::new(pool.clone())),
            regulators: Arc::new(SqliteRegulatorDirectory::new(pool.clone())),
            run_log: Arc::new(SqliteRunLog::new(pool.clone()).with_lock_wait(max_lock_wait_ms)),
            subscribers: Arc::new(SqliteSubscriberDirectory::new(pool.clone())),
            notifier: Arc::new(
                SqliteOutboxNotifier::new(pool.clone()).with_lock_wait(max_lock_wait_ms),
            ),
            translator: Arc::new(Translator::new()),
        }
    }
}

/// What one completed cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: String,
    pub sources: Vec<SourceReport>,
    /// Bulk and streamed outcomes combined
    pub batch: BatchReport,
    pub analytics: CycleAnalytics,
    pub records_found: usize,
    pub previous_records: i64,
    pub email_sent: bool,
}

pub struct CycleController {
    pipeline: Pipeline,
    config: IngestConfig,
    toml: TomlConfig,
    pool: SqlitePool,
    registry: SourceRegistry,
    orchestrator: SourceOrchestrator,
    scheduler: BatchScheduler,
    process_snapshot: Option<SourceSnapshot>,
    prepared: bool,
}

impl CycleController {
    pub fn new(
        pipeline: Pipeline,
        config: IngestConfig,
        toml: TomlConfig,
        pool: SqlitePool,
        registry: SourceRegistry,
    ) -> Self {
        let normalizer = Normalizer::new(pipeline.translator.clone(), config.prefix_identifier);
        let engine = DedupEngine::new(pipeline.canonical.clone(), pipeline.staging.clone());
        let scheduler = BatchScheduler::new(normalizer, engine, config.batch)
            .with_error_log(Arc::new(BatchErrorLog::new(config.error_log.clone())));
        let orchestrator = SourceOrchestrator::new(scheduler.clone());

        Self {
            pipeline,
            config,
            toml,
            pool,
            registry,
            orchestrator,
            scheduler,
            process_snapshot: None,
            prepared: false,
        }
    }

    /// Clear staging and take the process-start snapshot; runs once
    pub async fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }

        let cleared = self
            .pipeline
            .staging
            .clear()
            .await
            .context("Failed to clear staging at startup")?;
        info!(rows = cleared, "Staging cleared at process start");

        if self.config.staging_scope == StagingScope::Process {
            let counts = self.pipeline.canonical.count_by_source().await?;
            self.process_snapshot = Some(SourceSnapshot::new(counts));
        }

        self.prepared = true;
        Ok(())
    }

    /// Run cycles until cancelled, `once` completes, or a cycle fails
    pub async fn run(&mut self, cancel: CancellationToken, once: bool) -> Result<()> {
        self.prepare().await?;

        loop {
            let report = self.run_cycle().await?;
            info!(
                cycle_id = %report.cycle_id,
                found = report.records_found,
                inserted = report.analytics.breakdown_total(),
                email_sent = report.email_sent,
                "Cycle complete: {}",
                report.batch.display_string()
            );

            if once {
                info!("Single cycle requested, exiting");
                return Ok(());
            }
            if cancel.is_cancelled() {
                info!("Shutdown requested, exiting after completed cycle");
                return Ok(());
            }

            info!(
                phase = %CyclePhase::Sleep,
                seconds = self.config.cycle_interval.as_secs(),
                "Sleeping until next cycle"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested during sleep");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.cycle_interval) => {}
            }
        }
    }

    /// One full cycle; a failure is written to the run log before returning
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.prepare().await?;

        let mut ctx = CycleContext::new(self.config.staging_scope);
        let mut ran_keys = String::new();

        match self.execute(&mut ctx, &mut ran_keys).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(
                    cycle_id = %ctx.cycle_id,
                    phase = %ctx.phase(),
                    error = %format!("{:#}", e),
                    "Cycle failed"
                );
                let summary = RunSummary::failed(ctx.cycle_id.clone(), ran_keys, format!("{:#}", e));
                if let Err(log_err) = self.pipeline.run_log.append(&summary).await {
                    error!(error = %log_err, "Failed to record failed cycle in run log");
                }
                Err(e.context(format!("Cycle {} failed in {}", ctx.cycle_id, ctx.phase())))
            }
        }
    }

    async fn execute(&self, ctx: &mut CycleContext, ran_keys: &mut String) -> Result<CycleReport> {
        ctx.enter(CyclePhase::Snapshot);
        ctx.previous_records = self.pipeline.canonical.count_all().await?;
        ctx.snapshot = match (&self.config.staging_scope, &self.process_snapshot) {
            (StagingScope::Process, Some(snapshot)) => snapshot.clone(),
            _ => SourceSnapshot::new(self.pipeline.canonical.count_by_source().await?),
        };
        info!(
            cycle_id = %ctx.cycle_id,
            previous_records = ctx.previous_records,
            sources = ctx.snapshot.counts.len(),
            "Cycle started"
        );

        ctx.enter(CyclePhase::Orchestrate);
        let (enabled, _tier) = resolve_enabled_sources(&self.pool, &self.toml).await?;
        let adapters = self.registry.select(enabled.as_deref());
        if adapters.is_empty() {
            warn!(cycle_id = %ctx.cycle_id, "No enabled sources to run");
        }
        let mut orchestration = self.orchestrator.run(adapters, &ctx.cycle_id).await;
        *ran_keys = orchestration.source_keys();
        for failed in orchestration.failed_sources() {
            warn!(cycle_id = %ctx.cycle_id, source = failed, "Source contributed no further records");
        }

        ctx.enter(CyclePhase::NormalizeDedupBatch);
        let bulk = std::mem::take(&mut orchestration.bulk);
        let mut batch = self.scheduler.process(bulk, &ctx.cycle_id).await;
        batch.merge(&orchestration.streamed);

        ctx.enter(CyclePhase::ResolveFamily);
        let resolver = FamilyResolver::new(
            self.pipeline.relationships.clone(),
            self.pipeline.canonical.clone(),
        );
        resolver
            .resolve(&[
                self.pipeline.canonical_family.as_ref(),
                self.pipeline.staging_family.as_ref(),
            ])
            .await?;

        ctx.enter(CyclePhase::Analyze);
        let staged = self
            .pipeline
            .staging
            .count_by_source(ctx.staging_filter())
            .await?;
        let descriptions = self.pipeline.regulators.descriptions().await?;
        let ran: Vec<String> = orchestration.reports.iter().map(|r| r.key.clone()).collect();
        let analytics = build_analytics(&ctx.snapshot.counts, &staged, &ran, &descriptions);
        info!(cycle_id = %ctx.cycle_id, "{}", analytics.display_string());

        if let Some(path) = &self.config.totals_file {
            if let Err(e) = write_totals_file(path, &analytics).await {
                warn!(path = %path.display(), error = %e, "Failed to write record totals file");
            }
        }

        ctx.enter(CyclePhase::Notify);
        let planner = NotificationPlanner::new(
            self.pipeline.subscribers.clone(),
            self.pipeline.notifier.clone(),
        );
        let email_sent = planner.notify(&ctx.cycle_id, &analytics).await?;

        ctx.enter(CyclePhase::Log);
        let summary = RunSummary {
            cycle_id: ctx.cycle_id.clone(),
            status: RunStatus::Success,
            sources: ran_keys.clone(),
            records_processed: orchestration.records_found() as i64,
            records_inserted: analytics.breakdown_total(),
            previous_records: ctx.previous_records,
            error_details: None,
            email_sent,
            operator: BOT_OPERATOR.to_string(),
            run_at: Utc::now(),
            source_breakdown: Some(analytics.to_json()),
        };
        self.pipeline.run_log.append(&summary).await?;

        Ok(CycleReport {
            cycle_id: ctx.cycle_id.clone(),
            records_found: orchestration.records_found(),
            sources: orchestration.reports,
            batch,
            analytics,
            previous_records: ctx.previous_records,
            email_sent,
        })
    }
}
