//! Name version selection, entity classification and splitting

use crate::services::translator::is_non_latin;
use once_cell::sync::Lazy;
use regex::Regex;

/// Legal-entity, institutional and company-form tokens
const ENTITY_INDICATORS: &[&str] = &[
    "INC.", "INC", "LLC", "LTD", "LIMITED", "CORP", "CORPORATION", "CO.", "COMPANY", "GROUP",
    "FOUNDATION", "ASSOCIATION", "INSTITUTE", "UNIVERSITY", "BANK", "TRUST", "FUND", "HOLDING",
    "ENTERPRISE", "ORGANIZATION", "SOCIETY", "PARTNERSHIP", "JOINT STOCK", "LIMITED LIABILITY",
    "PUBLIC", "PRIVATE", "FEDERAL", "STATE", "GOVERNMENT", "MINISTRY", "DEPARTMENT",
    "ADMINISTRATION", "MANAGEMENT", "BUREAU", "AGENCY", "SERVICE", "INSTITUTION",
    "ESTABLISHMENT", "OFFICE", "CENTER", "CENTRE", "COUNCIL", "COMMITTEE", "COMMISSION", "BOARD",
    "S.A.", "S.L.", "SARL", "GMBH", "AG", "KG", "OHG", "BERHAD", "PVT", "PLC", "JSC", "OAO",
    "ZAO", "OOO", "PAO", "AO", "PJSC", "SPAOLO", "SOCIETA", "AZIONI", "D.O.O.", "SRL", "S.R.L.",
    "LTDA", "LTDA.", "S.A. DE C.V.", "DE C.V.", "PTY LTD", "PTY", "SCHOOL", "COLLEGE", "ACADEMY",
    "RESEARCH", "LABORATORY", "LAB", "CLINIC", "HOSPITAL", "MEDICAL", "HEALTH", "SANATORIUM",
    "PHARMACY", "HEALTHCARE", "CONVALESCENT", "REHABILITATION", "AMBULATORY", "МИНИСТЕРСТВО",
    "ГОСУДАРСТВЕННОЕ", "УЧРЕЖДЕНИЕ", "УПРАВЛЕНИЕ", "КОМИТЕТ", "СЛУЖБА", "PRISON", "CORRECTIONAL",
    "DETENTION", "SECURITY", "SECURITIES", "INVESTMENT", "ASSET", "CAPITAL", "FINANCIAL",
    "INSURANCE", "MUTUAL", "PENSION", "CREDIT", "SAVINGS",
];

/// Common words in vessel names
const VESSEL_INDICATORS: &[&str] = &[
    "SHIP", "VESSEL", "BOAT", "YACHT", "FERRY", "TANKER", "CARGO", "FREIGHTER", "TRADER",
    "NAVIGATOR", "EXPLORER", "OCEAN", "SEA", "MARINE", "MARITIME", "STAR", "SKY", "QUEEN", "KING",
    "LADY", "LORD", "PRINCESS", "PRINCE", "FALCON", "EAGLE", "TIGER", "LION", "ISLAND", "MARMARA",
    "AMBASSADOR", "SHIPPING", "FLEET", "NAVIGATION", "CARRIER", "BULK", "ENERGY", "GALAXY",
    "UNIVERSE", "COSMOS", "TRIUMPH", "VICTORY", "GLORY", "SPIRIT", "WIND", "WAVE", "TIDE",
    "CURRENT", "STREAM", "FLOW",
];

const QUOTE_CHARS: &[char] = &['"', '\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'];

/// Upper-case word followed by a number, e.g. `PANDO 1`
static WORD_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]+\s+\d+\b").expect("valid regex"));

/// Parsed components of an individual's name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub first: Option<String>,
    pub middle: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
}

/// Pick the canonical alternative from a `;`-separated multi-version name
///
/// Returns the longest Latin alternative, or the first non-empty one with
/// `true` when every alternative is non-Latin and needs translation.
pub fn select_name_version(full_name: &str) -> (String, bool) {
    let parts: Vec<&str> = full_name
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let best_latin = parts
        .iter()
        .filter(|p| !is_non_latin(p))
        .fold(None::<&str>, |best, p| match best {
            Some(b) if b.chars().count() >= p.chars().count() => Some(b),
            _ => Some(*p),
        });

    match (best_latin, parts.first()) {
        (Some(latin), _) => (latin.to_string(), false),
        (None, Some(first)) => (first.to_string(), true),
        (None, None) => (full_name.trim().to_string(), false),
    }
}

/// Word-bounded match of any indicator in an upper-cased token sequence
///
/// Tokens and indicators are compared with trailing dots removed so that
/// `LTD.` and `LTD` are equivalent.
fn contains_indicator(tokens: &[String], indicators: &[&str]) -> bool {
    let haystack = format!(" {} ", tokens.join(" "));
    indicators.iter().any(|indicator| {
        let needle: Vec<&str> = indicator
            .split_whitespace()
            .map(|t| t.trim_end_matches('.'))
            .collect();
        haystack.contains(&format!(" {} ", needle.join(" ")))
    })
}

fn indicator_tokens(name: &str) -> Vec<String> {
    name.to_uppercase()
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | '/'))
        .map(|t| t.trim_matches(|c: char| QUOTE_CHARS.contains(&c) || c == '\''))
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// True when the name belongs to an organization or vessel rather than a person
pub fn is_entity_name(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }

    let tokens = indicator_tokens(name);
    if contains_indicator(&tokens, ENTITY_INDICATORS) {
        return true;
    }

    if name.chars().count() > 100 {
        return true;
    }

    if name.chars().any(|c| QUOTE_CHARS.contains(&c)) {
        return true;
    }

    if contains_indicator(&tokens, VESSEL_INDICATORS) {
        return true;
    }

    let separators = name.chars().filter(|c| matches!(c, ';' | ',')).count();
    if separators >= 2 && name.chars().count() > 50 {
        return true;
    }

    if WORD_NUMBER_RE.is_match(name) {
        return true;
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    if let [_, .., last] = words.as_slice() {
        let mut chars = last.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_alphabetic() {
                return true;
            }
        }
    }

    false
}

/// Split an individual's name into components
///
/// `Surname, Given` when there is exactly one comma; otherwise by whitespace.
pub fn split_person_name(name: &str) -> NameParts {
    let name = name.trim();

    if name.contains(',') {
        let parts: Vec<&str> = name.split(',').map(str::trim).collect();
        if let [surname, first] = parts.as_slice() {
            return NameParts {
                first: non_empty(first),
                surname: non_empty(surname),
                ..Default::default()
            };
        }
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => NameParts::default(),
        [first] => NameParts {
            first: non_empty(first),
            ..Default::default()
        },
        [first, surname] => NameParts {
            first: non_empty(first),
            surname: non_empty(surname),
            ..Default::default()
        },
        [first, middle @ .., surname] => NameParts {
            first: non_empty(first),
            middle: non_empty(&middle.join(" ")),
            surname: non_empty(surname),
            title: None,
        },
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
