//! Per-cycle state passed explicitly through every phase

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;
use watchlist_common::config::StagingScope;

/// Cycle phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Snapshot,
    Orchestrate,
    NormalizeDedupBatch,
    ResolveFamily,
    Analyze,
    Notify,
    Log,
    Sleep,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Snapshot => "SNAPSHOT",
            CyclePhase::Orchestrate => "ORCHESTRATE",
            CyclePhase::NormalizeDedupBatch => "NORMALIZE_DEDUP_BATCH",
            CyclePhase::ResolveFamily => "RESOLVE_FAMILY",
            CyclePhase::Analyze => "ANALYZE",
            CyclePhase::Notify => "NOTIFY",
            CyclePhase::Log => "LOG",
            CyclePhase::Sleep => "SLEEP",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-name → canonical count, captured before any insertion it covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub counts: HashMap<String, i64>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl SourceSnapshot {
    pub fn new(counts: HashMap<String, i64>) -> Self {
        Self {
            counts,
            taken_at: Some(Utc::now()),
        }
    }

    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

pub struct CycleContext {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub scope: StagingScope,
    pub snapshot: SourceSnapshot,
    /// Canonical record count when this cycle started
    pub previous_records: i64,
    phase: CyclePhase,
}

impl CycleContext {
    pub fn new(scope: StagingScope) -> Self {
        Self {
            cycle_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            scope,
            snapshot: SourceSnapshot::default(),
            previous_records: 0,
            phase: CyclePhase::Snapshot,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn enter(&mut self, phase: CyclePhase) {
        self.phase = phase;
        tracing::debug!(cycle_id = %self.cycle_id, phase = %phase, "Entering phase");
    }

    /// Staging filter for analytics: this cycle only, or everything since start
    pub fn staging_filter(&self) -> Option<&str> {
        match self.scope {
            StagingScope::Cycle => Some(&self.cycle_id),
            StagingScope::Process => None,
        }
    }
}
