//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "WATCHLIST_ROOT_FOLDER";

/// Environment variable listing enabled source keys (comma separated)
pub const ENABLED_SOURCES_ENV: &str = "WATCHLIST_ENABLED_SOURCES";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "watchlist.db";

const CONFIG_DIR_NAME: &str = "watchlist";
const CONFIG_FILE_NAME: &str = "watchlist-ingest.toml";

/// Parsed contents of `watchlist-ingest.toml`
///
/// Every section is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub enabled_sources: Option<Vec<String>>,
    #[serde(default)]
    pub sources: Vec<SourceDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[ingest]` table; unset keys fall back to compiled defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSection {
    pub batch_size: Option<usize>,
    pub max_workers: Option<usize>,
    pub cycle_interval_secs: Option<u64>,
    pub staging_scope: Option<StagingScope>,
    pub prefix_identifier: Option<bool>,
    pub error_log: Option<PathBuf>,
    pub totals_file: Option<PathBuf>,
}

/// Which staged rows count as "new" for a cycle's analytics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingScope {
    /// Only rows staged by the current cycle, against a per-cycle snapshot
    #[default]
    Cycle,
    /// Every row staged since process start, against the process-start snapshot
    Process,
}

/// File format of a declared source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON array of raw records, read in one go
    Json,
    /// Newline-delimited JSON records, yielded in batches
    Jsonl,
}

/// `[[sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDecl {
    pub key: String,
    pub kind: SourceKind,
    pub path: PathBuf,
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Optional `source field -> canonical field` mapping
    #[serde(default)]
    pub field_map: Option<HashMap<String, String>>,
}

impl TomlConfig {
    /// Load and parse a TOML file; a missing file is an error
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the file if present, otherwise return defaults with a warning
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize back to TOML, creating parent directories as needed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Default location of `watchlist-ingest.toml` for this platform
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `WATCHLIST_ROOT_FOLDER`
/// 3. `root_folder` in the TOML file
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib/watchlist"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/watchlist"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\watchlist"))
    } else {
        PathBuf::from("./watchlist_data")
    }
}

/// Path of the SQLite database under a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_key_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
