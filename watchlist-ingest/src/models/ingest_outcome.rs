//! Per-record results of the deduplication engine

use serde::{Deserialize, Serialize};

/// Why a candidate was not inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A canonical record with the same identifier already exists
    DuplicateIdentifier,
    /// No identifier could be supplied or derived
    MissingIdentifier,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateIdentifier => "duplicate_identifier",
            SkipReason::MissingIdentifier => "missing_identifier",
        }
    }
}

/// Result of ingesting one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Inserted into the canonical store and mirrored into staging
    New { watchlist_id: String, source: String },
    /// Not inserted
    Skipped {
        watchlist_id: Option<String>,
        reason: SkipReason,
    },
}

impl IngestOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, IngestOutcome::New { .. })
    }
}

/// Denormalized relationship name lists written back onto a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyFields {
    pub spouse: Option<String>,
    pub children: Option<String>,
    pub parents: Option<String>,
    pub relative: Option<String>,
}

impl FamilyFields {
    pub fn is_empty(&self) -> bool {
        self.spouse.is_none()
            && self.children.is_none()
            && self.parents.is_none()
            && self.relative.is_none()
    }
}
