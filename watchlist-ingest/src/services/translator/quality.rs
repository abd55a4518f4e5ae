//! Machine-translation candidate scoring

use super::script::{detect_script, is_latin_letter, Script};

/// Minimum score a candidate must reach to be accepted
pub const ACCEPTANCE_FLOOR: f32 = 0.3;

/// Generic filler output produced by engines that did not understand the input
const STOP_LIST: &[&str] = &[
    "no.", "no", "yes", "huh", "?", "null", "oh, my god.", "hello", "hi", "ok", "okay", "good",
    "bad", "error", "♪", ")", "(", "[", "]", "page", "map", "picture",
];

const REJECTED_CHARS: &[char] = &['♪', '[', ']', '(', ')', '{', '}'];

/// Score a candidate translation in `[0.0, 1.0]`
///
/// `lang_code` is the source language of the engine pair that produced the
/// candidate.
pub fn score_translation(original: &str, candidate: &str, lang_code: &str) -> f32 {
    if candidate.is_empty() || candidate == original {
        return 0.0;
    }

    let cleaned = candidate.trim();
    if STOP_LIST.contains(&cleaned.to_lowercase().as_str()) {
        return 0.0;
    }

    if candidate.chars().any(|c| REJECTED_CHARS.contains(&c)) {
        return 0.0;
    }

    let original_len = original.chars().count().max(1) as f32;
    let ratio = cleaned.chars().count() as f32 / original_len;
    if !(0.2..=3.0).contains(&ratio) {
        return 0.0;
    }

    let script = detect_script(original);
    if !matches!(script, Script::Latin | Script::Unknown)
        && candidate.chars().any(|c| script.contains(c))
    {
        return 0.1;
    }

    let mut score = 0.5;

    if (0.5..=2.0).contains(&ratio) {
        score += 0.2;
    }

    if candidate.chars().any(is_latin_letter) {
        score += 0.2;
    }

    if candidate.split_whitespace().count() >= 2 {
        score += 0.1;
    }

    if script.associated_languages().contains(&lang_code) {
        score += 0.2;
    }

    f32::min(score, 1.0)
}
