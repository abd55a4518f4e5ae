//! Run log entry appended once per cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub cycle_id: String,
    pub status: RunStatus,
    /// Comma-joined source keys that ran
    pub sources: String,
    /// Raw records found (bulk plus streamed)
    pub records_processed: i64,
    /// Sum of `new` over the analytics rows
    pub records_inserted: i64,
    /// Canonical record count before the cycle
    pub previous_records: i64,
    pub error_details: Option<String>,
    pub email_sent: bool,
    pub operator: String,
    pub run_at: DateTime<Utc>,
    /// Per-source breakdown as JSON
    pub source_breakdown: Option<serde_json::Value>,
}

impl RunSummary {
    /// Zero-count entry for a cycle that failed fatally
    pub fn failed(cycle_id: impl Into<String>, sources: String, error: impl Into<String>) -> Self {
        Self {
            cycle_id: cycle_id.into(),
            status: RunStatus::Error,
            sources,
            records_processed: 0,
            records_inserted: 0,
            previous_records: 0,
            error_details: Some(error.into()),
            email_sent: false,
            operator: "BOT".to_string(),
            run_at: Utc::now(),
            source_breakdown: None,
        }
    }

    pub fn processing_notes(&self) -> String {
        format!("email_sent={}", self.email_sent)
    }

    pub fn email_status(&self) -> &'static str {
        if self.email_sent {
            "sent"
        } else {
            "not_sent"
        }
    }
}
