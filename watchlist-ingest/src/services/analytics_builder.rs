//! Analytics Builder
//!
//! Per-source old/new/total counts for a cycle, computed from the pre-cycle
//! snapshot and staging counts instead of re-scanning the canonical store.
//! Rows exist for every source that ran and every source present in staging,
//! so the sum of `new` always equals the staging size for the scope.

use crate::models::SourceBreakdown;
use crate::sources::source_code;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use watchlist_common::Result;

pub const TOTALS_FILE_NAME: &str = "previous_record_totals.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub source: String,
    pub description: String,
    pub old: i64,
    pub new: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAnalytics {
    /// Sorted by source code
    pub rows: Vec<AnalyticsRow>,
}

impl CycleAnalytics {
    pub fn breakdown_total(&self) -> i64 {
        self.rows.iter().map(|r| r.new).sum()
    }

    pub fn old_total(&self) -> i64 {
        self.rows.iter().map(|r| r.old).sum()
    }

    pub fn grand_total(&self) -> i64 {
        self.rows.iter().map(|r| r.total).sum()
    }

    pub fn breakdown(&self) -> Vec<SourceBreakdown> {
        self.rows
            .iter()
            .map(|r| SourceBreakdown {
                list_name: r.source.clone(),
                list_desc: r.description.clone(),
                old_record: r.old,
                new_record: r.new,
                total: r.total,
            })
            .collect()
    }

    /// Breakdown keyed by source code, as stored with the run log
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .breakdown()
            .into_iter()
            .map(|b| {
                let code = b.list_name.clone();
                (code, serde_json::to_value(b).unwrap_or(serde_json::Value::Null))
            })
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} sources: {} old, {} new, {} total",
            self.rows.len(),
            self.old_total(),
            self.breakdown_total(),
            self.grand_total()
        )
    }
}

/// Build one row per source that ran or has staged records
///
/// Keys are reduced to source codes before lookup. Descriptions fall back
/// to the code when the regulator directory has no entry.
pub fn build_analytics(
    snapshot: &HashMap<String, i64>,
    staged: &HashMap<String, i64>,
    ran_keys: &[String],
    descriptions: &HashMap<String, String>,
) -> CycleAnalytics {
    let mut new_by_code: BTreeMap<String, i64> = BTreeMap::new();
    for key in ran_keys {
        new_by_code.entry(source_code(key)).or_insert(0);
    }
    for (key, count) in staged {
        *new_by_code.entry(source_code(key)).or_insert(0) += count;
    }

    let mut old_by_code: HashMap<String, i64> = HashMap::new();
    for (key, count) in snapshot {
        *old_by_code.entry(source_code(key)).or_insert(0) += count;
    }

    let rows = new_by_code
        .into_iter()
        .map(|(code, new)| {
            let old = old_by_code.get(&code).copied().unwrap_or(0);
            AnalyticsRow {
                description: descriptions.get(&code).cloned().unwrap_or_else(|| code.clone()),
                source: code,
                old,
                new,
                total: old + new,
            }
        })
        .collect();

    CycleAnalytics { rows }
}

/// Overwrite the totals file with one `CODE:total` line per row
pub async fn write_totals_file(path: &Path, analytics: &CycleAnalytics) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body: String = analytics
        .rows
        .iter()
        .map(|r| format!("{}:{}\n", r.source, r.total))
        .collect();
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
