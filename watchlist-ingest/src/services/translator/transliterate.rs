//! Character-for-character transliteration tables

use super::script::{detect_script, Script};

#[rustfmt::skip]
fn cyrillic(c: char) -> Option<&'static str> {
    let s = match c {
        'А' => "A", 'а' => "a", 'Б' => "B", 'б' => "b", 'В' => "V", 'в' => "v",
        'Г' => "G", 'г' => "g", 'Д' => "D", 'д' => "d", 'Е' => "E", 'е' => "e",
        'Ё' => "Yo", 'ё' => "yo", 'Ж' => "Zh", 'ж' => "zh", 'З' => "Z", 'з' => "z",
        'И' => "I", 'и' => "i", 'Й' => "Y", 'й' => "y", 'К' => "K", 'к' => "k",
        'Л' => "L", 'л' => "l", 'М' => "M", 'м' => "m", 'Н' => "N", 'н' => "n",
        'О' => "O", 'о' => "o", 'П' => "P", 'п' => "p", 'Р' => "R", 'р' => "r",
        'С' => "S", 'с' => "s", 'Т' => "T", 'т' => "t", 'У' => "U", 'у' => "u",
        'Ф' => "F", 'ф' => "f", 'Х' => "Kh", 'х' => "kh", 'Ц' => "Ts", 'ц' => "ts",
        'Ч' => "Ch", 'ч' => "ch", 'Ш' => "Sh", 'ш' => "sh", 'Щ' => "Shch", 'щ' => "shch",
        'Ъ' | 'ъ' | 'Ь' | 'ь' => "",
        'Ы' => "Y", 'ы' => "y", 'Э' => "E", 'э' => "e",
        'Ю' => "Yu", 'ю' => "yu", 'Я' => "Ya", 'я' => "ya",
        // Ukrainian
        'Є' => "Ye", 'є' => "ye", 'І' => "I", 'і' => "i", 'Ї' => "Yi", 'ї' => "yi",
        'Ґ' => "G", 'ґ' => "g",
        _ => return None,
    };
    Some(s)
}

#[rustfmt::skip]
fn armenian(c: char) -> Option<&'static str> {
    let s = match c {
        'Ա' => "A", 'ա' => "a", 'Բ' => "B", 'բ' => "b", 'Գ' => "G", 'գ' => "g",
        'Դ' => "D", 'դ' => "d", 'Ե' => "E", 'ե' => "e", 'Զ' => "Z", 'զ' => "z",
        'Է' => "E", 'է' => "e", 'Ը' => "E", 'ը' => "e", 'Թ' => "T", 'թ' => "t",
        'Ժ' => "Zh", 'ժ' => "zh", 'Ի' => "I", 'ի' => "i", 'Լ' => "L", 'լ' => "l",
        'Խ' => "Kh", 'խ' => "kh", 'Ծ' => "Ts", 'ծ' => "ts", 'Կ' => "K", 'կ' => "k",
        'Հ' => "H", 'հ' => "h", 'Ձ' => "Dz", 'ձ' => "dz", 'Ղ' => "Gh", 'ղ' => "gh",
        'Ճ' => "Ch", 'ճ' => "ch", 'Մ' => "M", 'մ' => "m", 'Յ' => "Y", 'յ' => "y",
        'Ն' => "N", 'ն' => "n", 'Շ' => "Sh", 'շ' => "sh", 'Ո' => "O", 'ո' => "o",
        'Չ' => "Ch", 'չ' => "ch", 'Պ' => "P", 'պ' => "p", 'Ջ' => "J", 'ջ' => "j",
        'Ռ' => "R", 'ռ' => "r", 'Ս' => "S", 'ս' => "s", 'Վ' => "V", 'վ' => "v",
        'Տ' => "T", 'տ' => "t", 'Ր' => "R", 'ր' => "r", 'Ց' => "Ts", 'ց' => "ts",
        'Ւ' => "U", 'ւ' => "u", 'Փ' => "P", 'փ' => "p", 'Ք' => "K", 'ք' => "k",
        'Օ' => "O", 'օ' => "o", 'Ֆ' => "F", 'ֆ' => "f",
        _ => return None,
    };
    Some(s)
}

#[rustfmt::skip]
fn arabic(c: char) -> Option<&'static str> {
    let s = match c {
        'ا' => "a", 'ب' => "b", 'ت' => "t", 'ث' => "th", 'ج' => "j", 'ح' => "h",
        'خ' => "kh", 'د' => "d", 'ذ' => "dh", 'ر' => "r", 'ز' => "z", 'س' => "s",
        'ش' => "sh", 'ص' => "s", 'ض' => "d", 'ط' => "t", 'ظ' => "z", 'ع' => "",
        'غ' => "gh", 'ف' => "f", 'ق' => "q", 'ك' => "k", 'ل' => "l", 'م' => "m",
        'ن' => "n", 'ه' => "h", 'و' => "w", 'ى' => "a", 'ي' => "y",
        'أ' => "a", 'إ' => "i", 'آ' => "aa", 'ؤ' => "u", 'ئ' => "i", 'ء' => "",
        'ة' => "a",
        _ => return None,
    };
    Some(s)
}

#[rustfmt::skip]
fn greek(c: char) -> Option<&'static str> {
    let s = match c {
        'Α' | 'Ά' => "A", 'α' | 'ά' => "a", 'Β' => "B", 'β' => "b", 'Γ' => "G", 'γ' => "g",
        'Δ' => "D", 'δ' => "d", 'Ε' | 'Έ' => "E", 'ε' | 'έ' => "e", 'Ζ' => "Z", 'ζ' => "z",
        'Η' | 'Ή' => "H", 'η' | 'ή' => "h", 'Θ' => "Th", 'θ' => "th",
        'Ι' | 'Ί' => "I", 'ι' | 'ί' | 'ϊ' => "i",
        'Κ' => "K", 'κ' => "k", 'Λ' => "L", 'λ' => "l", 'Μ' => "M", 'μ' => "m",
        'Ν' => "N", 'ν' => "n", 'Ξ' => "X", 'ξ' => "x", 'Ο' | 'Ό' => "O", 'ο' | 'ό' => "o",
        'Π' => "P", 'π' => "p", 'Ρ' => "R", 'ρ' => "r", 'Σ' => "S", 'σ' | 'ς' => "s",
        'Τ' => "T", 'τ' => "t", 'Υ' | 'Ύ' => "Y", 'υ' | 'ύ' | 'ϋ' => "y",
        'Φ' => "F", 'φ' => "f", 'Χ' => "Ch", 'χ' => "ch", 'Ψ' => "Ps", 'ψ' => "ps",
        'Ω' | 'Ώ' => "O", 'ω' | 'ώ' => "o",
        _ => return None,
    };
    Some(s)
}

#[rustfmt::skip]
fn hebrew(c: char) -> Option<&'static str> {
    let s = match c {
        'א' => "a", 'ב' => "b", 'ג' => "g", 'ד' => "d", 'ה' => "h", 'ו' => "v",
        'ז' => "z", 'ח' => "ch", 'ט' => "t", 'י' => "y", 'כ' | 'ך' => "k", 'ל' => "l",
        'מ' | 'ם' => "m", 'נ' | 'ן' => "n", 'ס' => "s", 'ע' => "", 'פ' | 'ף' => "p",
        'צ' | 'ץ' => "ts", 'ק' => "q", 'ר' => "r", 'ש' => "sh", 'ת' => "t",
        _ => return None,
    };
    Some(s)
}

/// Transliterate with the table of a given script
///
/// Characters outside the table pass through unchanged.
pub fn transliterate_script(text: &str, script: Script) -> String {
    let table: fn(char) -> Option<&'static str> = match script {
        Script::Cyrillic => cyrillic,
        Script::Armenian => armenian,
        Script::Arabic => arabic,
        Script::Greek => greek,
        Script::Hebrew => hebrew,
        Script::Latin | Script::Unknown => return text.to_string(),
    };

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match table(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Transliterate using the detected script, `None` when nothing changed
pub fn transliterate(text: &str) -> Option<String> {
    let script = detect_script(text);
    let result = transliterate_script(text, script);
    if result != text {
        tracing::debug!(script = %script, original = text, result = %result, "Transliterated");
        Some(result)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic() {
        assert_eq!(
            transliterate("Иванов Петр Сергеевич").as_deref(),
            Some("Ivanov Petr Sergeevich")
        );
        assert_eq!(transliterate("Щукин Юрий").as_deref(), Some("Shchukin Yuriy"));
        assert_eq!(transliterate("Объект").as_deref(), Some("Obekt"));
    }

    #[test]
    fn test_other_scripts() {
        assert_eq!(transliterate("Αλέξανδρος").as_deref(), Some("Alexandros"));
        assert_eq!(transliterate("דוד").as_deref(), Some("dvd"));
        assert_eq!(transliterate("محمد").as_deref(), Some("mhmd"));
        assert_eq!(transliterate("Արամ").as_deref(), Some("Aram"));
    }

    #[test]
    fn test_latin_and_unknown_unchanged() {
        assert_eq!(transliterate("John Smith"), None);
        assert_eq!(transliterate("株式会社"), None);
        assert_eq!(transliterate(""), None);
    }

    #[test]
    fn test_untabled_characters_pass_through() {
        assert_eq!(transliterate_script("Иван 7", Script::Cyrillic), "Ivan 7");
    }
}
