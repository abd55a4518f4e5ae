//! Source adapters and the adapter registry
//!
//! Adapters register under their key (`RUN_<CODE>_LIST`). The enabled-key
//! list is matched case-insensitively.

pub mod file_source;

pub use file_source::{JsonFileSource, JsonlFileSource, DEFAULT_STREAM_BATCH_SIZE};

use crate::types::SourceAdapter;
use std::path::Path;
use std::sync::Arc;
use watchlist_common::config::{SourceDecl, SourceKind};

const KEY_PREFIX: &str = "RUN_";
const KEY_SUFFIX: &str = "_LIST";

/// Reduce a source key to its code: `RUN_OFAC_LIST` becomes `OFAC`
///
/// Values without the prefix or suffix are returned trimmed and otherwise
/// unchanged.
pub fn source_code(key: &str) -> String {
    let key = key.trim();
    let without_prefix = match key.get(..KEY_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(KEY_PREFIX) && key.len() > KEY_PREFIX.len() => {
            &key[KEY_PREFIX.len()..]
        }
        _ => key,
    };
    let cut = without_prefix.len().saturating_sub(KEY_SUFFIX.len());
    match without_prefix.get(cut..) {
        Some(tail) if cut > 0 && tail.eq_ignore_ascii_case(KEY_SUFFIX) => without_prefix[..cut].to_string(),
        _ => without_prefix.to_string(),
    }
}

/// Registered adapters, in registration order
#[derive(Default, Clone)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter; a later adapter with the same key replaces the earlier one
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        if let Some(pos) = self
            .adapters
            .iter()
            .position(|a| a.key().eq_ignore_ascii_case(adapter.key()))
        {
            tracing::warn!(key = adapter.key(), "Source registered twice, replacing");
            self.adapters[pos] = adapter;
        } else {
            self.adapters.push(adapter);
        }
    }

    /// Adapters for every `[[sources]]` declaration
    ///
    /// Relative paths are resolved against the root folder.
    pub fn from_declarations(decls: &[SourceDecl], root_folder: &Path) -> Self {
        let mut registry = Self::new();
        for decl in decls {
            let path = if decl.path.is_absolute() {
                decl.path.clone()
            } else {
                root_folder.join(&decl.path)
            };
            let adapter: Arc<dyn SourceAdapter> = match decl.kind {
                SourceKind::Json => Arc::new(
                    JsonFileSource::new(decl.key.clone(), path).with_field_map(decl.field_map.clone()),
                ),
                SourceKind::Jsonl => Arc::new(
                    JsonlFileSource::new(
                        decl.key.clone(),
                        path,
                        decl.batch_size.unwrap_or(DEFAULT_STREAM_BATCH_SIZE),
                    )
                    .with_field_map(decl.field_map.clone()),
                ),
            };
            registry.register(adapter);
        }
        registry
    }

    pub fn keys(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapters whose key appears in `enabled`; all of them when `None`
    ///
    /// Enabled keys with no registered adapter are logged and ignored.
    pub fn select(&self, enabled: Option<&[String]>) -> Vec<Arc<dyn SourceAdapter>> {
        let Some(enabled) = enabled else {
            return self.adapters.clone();
        };

        for key in enabled {
            if !self.adapters.iter().any(|a| a.key().eq_ignore_ascii_case(key)) {
                tracing::warn!(key = %key, "Enabled source has no registered adapter");
            }
        }

        self.adapters
            .iter()
            .filter(|a| enabled.iter().any(|k| k.eq_ignore_ascii_case(a.key())))
            .cloned()
            .collect()
    }
}
