//! Script detection and best-effort Latin rendering of names
//!
//! Attempt order for non-Latin input:
//! 1. Cache keyed by the exact input
//! 2. Every machine translation pair into English, best candidate above the floor
//! 3. Transliteration table of the detected script
//! 4. Latin fragments split on whitespace or semicolons
//! 5. The original text
//!
//! Every outcome is memoized, including fallbacks.

pub mod quality;
pub mod script;
pub mod transliterate;

use crate::types::TranslationBackend;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use quality::{score_translation, ACCEPTANCE_FLOOR};
pub use script::{detect_script, has_no_latin_letters, is_latin_letter, is_non_latin, Script};
pub use transliterate::transliterate;

/// Language every name is rendered into
pub const TARGET_LANGUAGE: &str = "en";

/// Which step produced a rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationMethod {
    /// Input was already Latin (or empty)
    Unchanged,
    MachineTranslation,
    Transliteration,
    LatinExtraction,
    /// Nothing worked; original returned
    Untranslatable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOutcome {
    pub text: String,
    /// True when `text` differs from the input
    pub translated: bool,
    pub method: TranslationMethod,
    /// Source language of the winning machine translation pair
    pub language: Option<String>,
}

impl TranslationOutcome {
    fn unchanged(text: &str, method: TranslationMethod) -> Self {
        Self {
            text: text.to_string(),
            translated: false,
            method,
            language: None,
        }
    }

    fn rendered(text: String, method: TranslationMethod, language: Option<String>) -> Self {
        Self {
            text,
            translated: true,
            method,
            language,
        }
    }
}

/// Shared translator with a process-wide cache
pub struct Translator {
    backend: Option<Arc<dyn TranslationBackend>>,
    cache: Mutex<HashMap<String, TranslationOutcome>>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// Translator without a machine translation engine
    pub fn new() -> Self {
        Self {
            backend: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_backend(backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            backend: Some(backend),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Render `text` in Latin script; never fails
    pub fn translate(&self, text: &str) -> TranslationOutcome {
        if text.trim().is_empty() || !is_non_latin(text) {
            return TranslationOutcome::unchanged(text, TranslationMethod::Unchanged);
        }

        if let Some(hit) = self.lock_cache().get(text) {
            return hit.clone();
        }

        let outcome = self.translate_uncached(text);

        self.lock_cache()
            .entry(text.to_string())
            .or_insert_with(|| outcome.clone());

        outcome
    }

    /// Number of memoized inputs
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, TranslationOutcome>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn translate_uncached(&self, text: &str) -> TranslationOutcome {
        let script = detect_script(text);
        tracing::debug!(script = %script, input = text, "Translating non-Latin text");

        if let Some((candidate, lang)) = self.best_machine_translation(text) {
            return TranslationOutcome::rendered(
                candidate,
                TranslationMethod::MachineTranslation,
                Some(lang),
            );
        }

        if let Some(result) = transliterate(text) {
            return TranslationOutcome::rendered(result, TranslationMethod::Transliteration, None);
        }

        if let Some(result) = extract_latin_fragments(text) {
            tracing::debug!(input = text, result = %result, "Extracted Latin fragments");
            return TranslationOutcome::rendered(result, TranslationMethod::LatinExtraction, None);
        }

        tracing::debug!(input = text, "No translation available");
        TranslationOutcome::unchanged(text, TranslationMethod::Untranslatable)
    }

    /// Highest-scoring candidate at or above the floor, with its language
    fn best_machine_translation(&self, text: &str) -> Option<(String, String)> {
        let backend = self.backend.as_ref()?;
        let mut best: Option<(String, String)> = None;
        let mut best_score = 0.0f32;

        for lang in backend.language_pairs(TARGET_LANGUAGE) {
            if lang == TARGET_LANGUAGE {
                continue;
            }
            match backend.translate(text, &lang, TARGET_LANGUAGE) {
                Ok(candidate) => {
                    let score = score_translation(text, &candidate, &lang);
                    if score > best_score && score >= ACCEPTANCE_FLOOR {
                        tracing::trace!(lang = %lang, score, candidate = %candidate, "Accepted candidate");
                        best_score = score;
                        best = Some((candidate, lang));
                    } else {
                        tracing::trace!(lang = %lang, score, candidate = %candidate, "Rejected candidate");
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        backend = backend.name(),
                        lang = %lang,
                        error = %e,
                        "Translation pair failed"
                    );
                }
            }
        }

        best
    }
}

/// Whitespace/semicolon-delimited fragments that are fully Latin, space-joined
pub fn extract_latin_fragments(text: &str) -> Option<String> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|p| !p.is_empty() && !is_non_latin(p))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// True if the text holds at least one alphabetic character outside Latin
pub fn contains_non_latin_letters(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic() && !is_latin_letter(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        outputs: Vec<(&'static str, std::result::Result<&'static str, ()>)>,
        calls: AtomicUsize,
    }

    impl TranslationBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        fn language_pairs(&self, _target: &str) -> Vec<String> {
            self.outputs.iter().map(|(l, _)| l.to_string()).collect()
        }

        fn translate(
            &self,
            _text: &str,
            from: &str,
            _to: &str,
        ) -> std::result::Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (_, out) = self
                .outputs
                .iter()
                .find(|(l, _)| *l == from)
                .ok_or_else(|| TranslateError::UnsupportedPair {
                    from: from.to_string(),
                    to: "en".to_string(),
                })?;
            match out {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(TranslateError::Backend {
                    lang: from.to_string(),
                    message: "engine crashed".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_latin_input_unchanged() {
        let translator = Translator::new();
        let outcome = translator.translate("John Smith");
        assert_eq!(outcome.text, "John Smith");
        assert!(!outcome.translated);
        assert_eq!(outcome.method, TranslationMethod::Unchanged);
        assert_eq!(translator.cache_len(), 0);
    }

    #[test]
    fn test_transliteration_fallback_without_backend() {
        let translator = Translator::new();
        let outcome = translator.translate("Иванов Петр Сергеевич");
        assert_eq!(outcome.text, "Ivanov Petr Sergeevich");
        assert!(outcome.translated);
        assert_eq!(outcome.method, TranslationMethod::Transliteration);
    }

    #[test]
    fn test_results_are_cached() {
        let backend = Arc::new(FakeBackend {
            outputs: vec![("ru", Ok("Ivanov Petr"))],
            calls: AtomicUsize::new(0),
        });
        let translator = Translator::with_backend(backend.clone());

        let first = translator.translate("Иванов Петр");
        let second = translator.translate("Иванов Петр");
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(translator.cache_len(), 1);
    }

    #[test]
    fn test_best_candidate_wins() {
        let backend = Arc::new(FakeBackend {
            outputs: vec![
                ("de", Ok("Hello")),
                ("fr", Err(())),
                ("it", Ok("Ivanov")),
                ("ru", Ok("Ivanov Peter")),
            ],
            calls: AtomicUsize::new(0),
        });
        let translator = Translator::with_backend(backend);

        let outcome = translator.translate("Иванов Петр");
        assert_eq!(outcome.text, "Ivanov Peter");
        assert_eq!(outcome.method, TranslationMethod::MachineTranslation);
        assert_eq!(outcome.language.as_deref(), Some("ru"));
    }

    #[test]
    fn test_rejected_candidates_fall_back_to_transliteration() {
        let backend = Arc::new(FakeBackend {
            outputs: vec![("ru", Ok("okay")), ("uk", Ok("Иванов Петр"))],
            calls: AtomicUsize::new(0),
        });
        let translator = Translator::with_backend(backend);

        let outcome = translator.translate("Иванов Петр");
        assert_eq!(outcome.text, "Ivanov Petr");
        assert_eq!(outcome.method, TranslationMethod::Transliteration);
    }

    #[test]
    fn test_latin_extraction_when_transliteration_unavailable() {
        let translator = Translator::new();
        let outcome = translator.translate("株式会社; ACME TRADING");
        assert_eq!(outcome.text, "ACME TRADING");
        assert_eq!(outcome.method, TranslationMethod::LatinExtraction);
    }

    #[test]
    fn test_untranslatable_returns_original() {
        let translator = Translator::new();
        let outcome = translator.translate("株式会社");
        assert_eq!(outcome.text, "株式会社");
        assert!(!outcome.translated);
        assert_eq!(outcome.method, TranslationMethod::Untranslatable);
    }

    #[test]
    fn test_every_known_script_renders_deterministically() {
        let translator = Translator::new();
        for input in ["Ալեքսանդր", "محمد علي", "Αλέξανδρος", "דוד כהן", "Иван"] {
            let a = translator.translate(input);
            let b = Translator::new().translate(input);
            assert!(a.translated, "{} was not rendered", input);
            assert_ne!(a.text, input);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_contains_non_latin_letters() {
        assert!(contains_non_latin_letters("Петр"));
        assert!(!contains_non_latin_letters("Agent 007"));
    }
}
