//! Record Normalizer
//!
//! Turns an untyped raw record into a canonical candidate:
//! field coercion, multi-version and non-Latin name handling, entity
//! classification, name splitting, identifier derivation, source
//! attribution, audit stamping and schema truncation.
//!
//! Pure CPU work; the batch scheduler runs it on the blocking pool.

pub mod fields;
pub mod identifier;
pub mod names;

use crate::error::NormalizeError;
use crate::services::translator::{contains_non_latin_letters, Translator};
use crate::sources::source_code;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use watchlist_common::models::fields as f;
use watchlist_common::time::{record_date_stamp, record_time_stamp};
use watchlist_common::{CanonicalRecord, RawRecord, WatchType};

pub use fields::{coerce_text, collect_fields, parse_ambiguous_date};
pub use identifier::{derive_watchlist_id, name_checksum};
pub use names::{is_entity_name, select_name_version, split_person_name, NameParts};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const BOT_OPERATOR: &str = "BOT";
pub const UNKNOWN_SOURCE: &str = "UNKNOWN";

/// Where a raw record came from
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceContext<'a> {
    /// Source code of the adapter that produced the record
    pub source_code: Option<&'a str>,
    /// Optional `source field -> canonical field` mapping
    pub field_map: Option<&'a HashMap<String, String>>,
}

#[derive(Clone)]
pub struct Normalizer {
    translator: Arc<Translator>,
    prefix_identifier: bool,
}

impl Normalizer {
    pub fn new(translator: Arc<Translator>, prefix_identifier: bool) -> Self {
        Self {
            translator,
            prefix_identifier,
        }
    }

    pub fn translator(&self) -> &Arc<Translator> {
        &self.translator
    }

    /// Normalize against the local clock
    pub fn normalize(
        &self,
        raw: &RawRecord,
        ctx: SourceContext<'_>,
    ) -> Result<CanonicalRecord, NormalizeError> {
        self.normalize_at(raw, ctx, Local::now())
    }

    /// Normalize with an explicit audit timestamp
    pub fn normalize_at(
        &self,
        raw: &RawRecord,
        ctx: SourceContext<'_>,
        now: DateTime<Local>,
    ) -> Result<CanonicalRecord, NormalizeError> {
        let mut fields = collect_fields(raw, ctx.field_map);

        let mut parts = NameParts {
            first: fields.remove(f::FIRST_NAME),
            middle: fields.remove(f::MIDDLE_NAME),
            surname: fields.remove(f::SURNAME),
            title: fields.remove(f::TITLE),
        };

        let full_name = match fields.remove(f::FULL_NAME) {
            Some(name) => Some(self.resolve_full_name(name, &mut parts)),
            None => compose_full_name(&parts),
        };

        for component in [
            &mut parts.first,
            &mut parts.middle,
            &mut parts.surname,
            &mut parts.title,
        ] {
            if let Some(value) = component.as_mut() {
                if contains_non_latin_letters(value) {
                    let outcome = self.translator.translate(value);
                    if outcome.translated {
                        *value = outcome.text.to_uppercase();
                    }
                }
            }
        }

        let full_name = full_name.ok_or_else(|| {
            NormalizeError::MissingIdentity("record carries no name".to_string())
        })?;

        let watch_type = fields
            .get(f::WATCH_TYPE)
            .and_then(|label| WatchType::parse(label))
            .or_else(|| {
                Some(if is_entity_name(&full_name) {
                    WatchType::Entity
                } else {
                    WatchType::Individual
                })
            });

        let watchlist_id = match fields.remove(f::WATCHLIST_ID) {
            Some(raw_id) => raw_id,
            None => derive_watchlist_id(&full_name, parts.first.as_deref(), self.prefix_identifier)
                .ok_or_else(|| {
                    NormalizeError::MissingIdentity(format!(
                        "no identifier derivable from '{}'",
                        full_name
                    ))
                })?,
        };

        let category = fields.remove(f::CATEGORY);
        let source = resolve_source(&fields, ctx.source_code, category.as_deref());

        let mut record = CanonicalRecord {
            watchlist_id,
            full_name,
            first_name: parts.first,
            middle_name: parts.middle,
            surname: parts.surname,
            title: parts.title,
            watch_type,
            source,
            reported_by: category.clone(),
            category,
            sub_category: fields.remove(f::SUB_CATEGORY),
            description: fields.remove(f::DESCRIPTION),
            nationality: fields.remove(f::NATIONALITY),
            address: fields.remove(f::ADDRESS),
            country: fields.remove(f::COUNTRY),
            remarks: fields.remove(f::REMARKS),
            action_date: fields.get(f::ACTION_DATE).and_then(|v| parse_ambiguous_date(v)),
            date_of_birth: fields.get(f::DOB).and_then(|v| parse_ambiguous_date(v)),
            flag_date: fields.get(f::FLAG_DATE).and_then(|v| parse_ambiguous_date(v)),
            spouse: None,
            children: None,
            parents: None,
            relative: None,
            language: DEFAULT_LANGUAGE.to_string(),
            operator: BOT_OPERATOR.to_string(),
            record_date: record_date_stamp(now),
            record_time: record_time_stamp(now),
        };

        record.truncate_to_schema();
        Ok(record)
    }

    /// Apply version selection, translation and splitting to the full name
    ///
    /// Components already on the record are kept, except after a
    /// multi-version selection which always re-derives them.
    fn resolve_full_name(&self, full_name: String, parts: &mut NameParts) -> String {
        if full_name.contains(';') {
            let (mut chosen, needs_translation) = select_name_version(&full_name);
            if needs_translation {
                let outcome = self.translator.translate(&chosen);
                if outcome.translated {
                    chosen = outcome.text.to_uppercase();
                }
            }
            if !is_entity_name(&chosen) {
                let split = split_person_name(&chosen);
                if split.first.is_some() {
                    parts.first = split.first;
                    parts.middle = split.middle.or(parts.middle.take());
                    parts.surname = split.surname.or(parts.surname.take());
                }
            }
            return chosen;
        }

        if is_pure_non_latin(&full_name) {
            let outcome = self.translator.translate(&full_name);
            if !outcome.translated {
                return full_name;
            }
            let translated = outcome.text.to_uppercase();
            fill_missing_parts(&translated, parts);
            return translated;
        }

        if parts.first.is_none() && parts.surname.is_none() {
            fill_missing_parts(&full_name, parts);
        }
        full_name
    }
}

/// Contains non-ASCII characters but no ASCII letter
fn is_pure_non_latin(name: &str) -> bool {
    name.chars().any(|c| !c.is_ascii()) && !name.chars().any(|c| c.is_ascii_alphabetic())
}

/// Split an individual's name into the components that are still empty
fn fill_missing_parts(name: &str, parts: &mut NameParts) {
    if is_entity_name(name) {
        return;
    }
    let split = split_person_name(name);
    if parts.first.is_none() {
        parts.first = split.first;
    }
    if parts.middle.is_none() {
        parts.middle = split.middle;
    }
    if parts.surname.is_none() {
        parts.surname = split.surname;
    }
}

/// Full name from components when the source only sent the parts
fn compose_full_name(parts: &NameParts) -> Option<String> {
    let joined = [&parts.first, &parts.middle, &parts.surname]
        .iter()
        .filter_map(|p| p.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// `source_key`, then `ricaSource`, then the adapter, then category, then `UNKNOWN`
fn resolve_source(
    fields: &HashMap<String, String>,
    adapter_code: Option<&str>,
    category: Option<&str>,
) -> String {
    let chosen = fields
        .get(f::SOURCE_KEY)
        .map(String::as_str)
        .or_else(|| fields.get(f::SOURCE).map(String::as_str))
        .or(adapter_code)
        .or(category)
        .unwrap_or(UNKNOWN_SOURCE);
    source_code(chosen)
}
