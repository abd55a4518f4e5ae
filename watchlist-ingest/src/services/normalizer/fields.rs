//! Field coercion and the ambiguous date heuristic

use chrono::NaiveDate;
use std::collections::HashMap;
use watchlist_common::RawRecord;

/// Coerce a raw text value: `nan` and blank become absent
pub fn coerce_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Carry fields from a raw record, optionally through a field mapping
///
/// With a mapping only mapped fields survive; each is looked up under its
/// source name first, then under its canonical name.
pub fn collect_fields(
    raw: &RawRecord,
    field_map: Option<&HashMap<String, String>>,
) -> HashMap<String, String> {
    let mut out = HashMap::new();
    match field_map {
        Some(map) => {
            for (source_field, canonical_field) in map {
                let value = raw
                    .get_text(source_field)
                    .and_then(|v| coerce_text(&v))
                    .or_else(|| raw.get_text(canonical_field).and_then(|v| coerce_text(&v)));
                if let Some(value) = value {
                    out.insert(canonical_field.clone(), value);
                }
            }
        }
        None => {
            for (key, _) in raw.fields() {
                if let Some(value) = raw.get_text(key).and_then(|v| coerce_text(&v)) {
                    out.insert(key.clone(), value);
                }
            }
        }
    }
    out
}

/// Parse a date whose day/month/year order is not declared
///
/// Separators are removed and a seven-digit value is treated as having lost
/// its leading zero. `DDMMYYYY` is tried first, then `YYYYMMDD`.
pub fn parse_ambiguous_date(value: &str) -> Option<NaiveDate> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != value.chars().filter(|c| c.is_alphanumeric()).count() {
        return None;
    }

    let digits = match digits.len() {
        8 => digits,
        7 => format!("0{}", digits),
        _ => return None,
    };

    let part = |range: std::ops::Range<usize>| -> Option<u32> {
        digits[range].trim_start_matches('0').parse::<u32>().ok()
    };

    let day_first = (|| {
        let day = part(0..2)?;
        let month = part(2..4)?;
        let year = part(4..8)?;
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    })();

    day_first.or_else(|| {
        let year = part(0..4)?;
        let month = part(4..6)?;
        let day = part(6..8)?;
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    })
}
