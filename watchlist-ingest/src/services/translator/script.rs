//! Unicode script classification
//!
//! A character is Latin when its Unicode name starts with `LATIN`; the ranges
//! below cover every block containing such letters.

use serde::{Deserialize, Serialize};

/// Scripts the detector distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Cyrillic,
    Armenian,
    Arabic,
    Greek,
    Hebrew,
    Unknown,
}

impl Script {
    pub fn as_str(&self) -> &'static str {
        match self {
            Script::Latin => "latin",
            Script::Cyrillic => "cyrillic",
            Script::Armenian => "armenian",
            Script::Arabic => "arabic",
            Script::Greek => "greek",
            Script::Hebrew => "hebrew",
            Script::Unknown => "unknown",
        }
    }

    /// True if `c` belongs to this script's letter set
    pub fn contains(&self, c: char) -> bool {
        match self {
            Script::Latin => is_latin_letter(c),
            Script::Cyrillic => is_cyrillic(c),
            Script::Armenian => is_armenian(c),
            Script::Arabic => is_arabic(c),
            Script::Greek => is_greek(c),
            Script::Hebrew => is_hebrew(c),
            Script::Unknown => false,
        }
    }

    /// Translation languages historically associated with this script
    pub fn associated_languages(&self) -> &'static [&'static str] {
        match self {
            Script::Arabic => &["ar", "fa"],
            Script::Cyrillic => &["ru", "uk", "bg"],
            Script::Greek => &["el"],
            Script::Hebrew => &["he"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const LATIN_RANGES: &[(u32, u32)] = &[
    (0x0041, 0x005A),
    (0x0061, 0x007A),
    (0x00C0, 0x00D6),
    (0x00D8, 0x00F6),
    (0x00F8, 0x024F),
    (0x0250, 0x02AF),
    (0x1D00, 0x1D2B),
    (0x1E00, 0x1EFF),
    (0x2C60, 0x2C7F),
    (0xA720, 0xA7FF),
    (0xAB30, 0xAB64),
    (0xFB00, 0xFB06),
    (0xFF21, 0xFF3A),
    (0xFF41, 0xFF5A),
];

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let cp = c as u32;
    ranges.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Letter whose Unicode name contains `LATIN`
pub fn is_latin_letter(c: char) -> bool {
    in_ranges(c, LATIN_RANGES)
}

pub fn is_cyrillic(c: char) -> bool {
    in_ranges(c, &[(0x0400, 0x04FF), (0x0500, 0x052F)])
}

pub fn is_armenian(c: char) -> bool {
    in_ranges(c, &[(0x0531, 0x0556), (0x0561, 0x0587)])
}

pub fn is_arabic(c: char) -> bool {
    in_ranges(
        c,
        &[(0x0620, 0x064A), (0x0671, 0x06D3), (0x0750, 0x077F), (0xFB50, 0xFDFF), (0xFE70, 0xFEFC)],
    )
}

pub fn is_greek(c: char) -> bool {
    in_ranges(c, &[(0x0370, 0x03FF), (0x1F00, 0x1FFF)])
}

pub fn is_hebrew(c: char) -> bool {
    in_ranges(c, &[(0x05D0, 0x05EA)])
}

/// Punctuation and whitespace never make text non-Latin
fn is_neutral(c: char) -> bool {
    c.is_ascii_punctuation() || c.is_whitespace() || matches!(c, '\u{2018}' | '\u{2019}')
}

/// True if any character is neither neutral nor a Latin letter
///
/// Digits have no `LATIN` in their Unicode names, so they count as non-Latin.
pub fn is_non_latin(text: &str) -> bool {
    text.chars().any(|c| !is_neutral(c) && !is_latin_letter(c))
}

/// True if the text contains no Latin letter at all
pub fn has_no_latin_letters(text: &str) -> bool {
    !text.chars().any(is_latin_letter)
}

/// Script with the highest character count, `Unknown` if none match
///
/// Ties resolve to the earlier script in detection order.
pub fn detect_script(text: &str) -> Script {
    const ORDER: [Script; 6] = [
        Script::Armenian,
        Script::Arabic,
        Script::Cyrillic,
        Script::Greek,
        Script::Hebrew,
        Script::Latin,
    ];

    let mut best = Script::Unknown;
    let mut best_count = 0usize;
    for script in ORDER {
        let count = text.chars().filter(|&c| script.contains(c)).count();
        if count > best_count {
            best = script;
            best_count = count;
        }
    }
    best
}
