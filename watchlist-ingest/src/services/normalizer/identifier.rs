//! Deterministic watchlist identifiers

use once_cell::sync::Lazy;
use regex::Regex;

/// Digits, whitespace and non-word characters
static STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d\s\W]+").expect("valid regex"));

/// Code-point sum of the lower-cased name with digits, whitespace and
/// non-word characters removed; `None` when nothing remains
pub fn name_checksum(full_name: &str) -> Option<u64> {
    let lowered = full_name.to_lowercase();
    let cleaned = STRIP_RE.replace_all(&lowered, "");
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().map(|c| c as u64).sum())
}

/// Derive the identifier for a record
///
/// With `prefix` the checksum is preceded by the upper-cased first token of
/// `first_name` (or of the full name when there is no first name).
pub fn derive_watchlist_id(full_name: &str, first_name: Option<&str>, prefix: bool) -> Option<String> {
    let checksum = name_checksum(full_name)?;
    if !prefix {
        return Some(checksum.to_string());
    }

    let token = first_name
        .and_then(|f| f.split_whitespace().next())
        .or_else(|| full_name.split_whitespace().next())
        .map(str::to_uppercase);

    match token {
        Some(token) => Some(format!("{}-{}", token, checksum)),
        None => Some(checksum.to_string()),
    }
}
