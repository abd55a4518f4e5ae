//! Configuration resolution for watchlist-ingest
//!
//! Compiled defaults, overridden by the TOML `[ingest]` table, overridden by
//! command-line flags. Enabled sources use a 3-tier lookup:
//! database `source_registry` → `WATCHLIST_ENABLED_SOURCES` → TOML.

use crate::services::batch_scheduler::{default_max_workers, BatchConfig, DEFAULT_BATCH_SIZE};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use watchlist_common::config::{
    database_path, parse_key_list, SourceDecl, StagingScope, TomlConfig, ENABLED_SOURCES_ENV,
};
use watchlist_common::Result;

/// One day between cycles
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_ERROR_LOG: &str = "logs/skipped_batch_error.log";

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub batch_size: Option<usize>,
    pub interval_secs: Option<u64>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub batch: BatchConfig,
    pub cycle_interval: Duration,
    pub staging_scope: StagingScope,
    pub prefix_identifier: bool,
    pub error_log: PathBuf,
    pub totals_file: Option<PathBuf>,
    pub sources: Vec<SourceDecl>,
}

impl IngestConfig {
    pub fn resolve(toml: &TomlConfig, root_folder: PathBuf, overrides: &CliOverrides) -> Self {
        let section = &toml.ingest;

        let batch_size = overrides
            .batch_size
            .or(section.batch_size)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        let max_workers = section
            .max_workers
            .filter(|n| *n > 0)
            .unwrap_or_else(default_max_workers);
        let interval_secs = overrides
            .interval_secs
            .or(section.cycle_interval_secs)
            .unwrap_or(DEFAULT_CYCLE_INTERVAL_SECS);

        let error_log = under_root(
            &root_folder,
            section
                .error_log
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG)),
        );
        let totals_file = section
            .totals_file
            .clone()
            .map(|p| under_root(&root_folder, p));

        Self {
            database_path: database_path(&root_folder),
            root_folder,
            batch: BatchConfig {
                batch_size,
                max_workers,
            },
            cycle_interval: Duration::from_secs(interval_secs),
            staging_scope: section.staging_scope.unwrap_or_default(),
            prefix_identifier: section.prefix_identifier.unwrap_or(true),
            error_log,
            totals_file,
            sources: toml.sources.clone(),
        }
    }
}

fn under_root(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

/// Where the enabled-source list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledSourceTier {
    Database,
    Environment,
    Toml,
    /// Nothing configured; every registered adapter runs
    AllRegistered,
}

impl EnabledSourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnabledSourceTier::Database => "database",
            EnabledSourceTier::Environment => "environment",
            EnabledSourceTier::Toml => "TOML",
            EnabledSourceTier::AllRegistered => "all registered",
        }
    }
}

/// Pick the highest-priority tier that supplied a list
pub fn choose_enabled_sources(
    database: Option<Vec<String>>,
    environment: Option<Vec<String>>,
    toml: Option<Vec<String>>,
) -> (Option<Vec<String>>, EnabledSourceTier) {
    let tiers = [
        (database, EnabledSourceTier::Database),
        (environment, EnabledSourceTier::Environment),
        (toml, EnabledSourceTier::Toml),
    ];

    let supplied: Vec<&'static str> = tiers
        .iter()
        .filter(|(list, _)| list.is_some())
        .map(|(_, tier)| tier.as_str())
        .collect();
    if supplied.len() > 1 {
        warn!(
            "Enabled sources found in multiple places: {}. Using {} (highest priority).",
            supplied.join(", "),
            supplied[0]
        );
    }

    tiers
        .into_iter()
        .find_map(|(list, tier)| list.map(|l| (Some(l), tier)))
        .unwrap_or((None, EnabledSourceTier::AllRegistered))
}

/// Resolve the enabled source keys for a cycle
///
/// Read every cycle so registry edits take effect without a restart.
pub async fn resolve_enabled_sources(
    pool: &SqlitePool,
    toml: &TomlConfig,
) -> Result<(Option<Vec<String>>, EnabledSourceTier)> {
    let database = crate::db::load_enabled_source_keys(pool).await?;
    let environment = std::env::var(ENABLED_SOURCES_ENV)
        .ok()
        .map(|v| parse_key_list(&v))
        .filter(|keys| !keys.is_empty());
    let toml_list = toml.enabled_sources.clone();

    let (keys, tier) = choose_enabled_sources(database, environment, toml_list);
    info!(
        tier = tier.as_str(),
        sources = keys.as_ref().map(|k| k.join(",")).unwrap_or_else(|| "*".to_string()),
        "Enabled sources resolved"
    );
    Ok((keys, tier))
}
