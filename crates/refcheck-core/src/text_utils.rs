//! Small text helpers shared by the parser and the matcher.

use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::UnicodeNormalization;

/// True for any Unicode letter (general categories Lu, Ll, Lt, Lm, Lo).
pub fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// Decompose `text` and keep only its letters, dropping diacritics,
/// digits and punctuation. Whitespace survives when `keep_spaces` is set.
///
/// `"Müller-Lüdenscheidt"` becomes `"MullerLudenscheidt"`.
pub fn letters_only(text: &str, keep_spaces: bool) -> String {
    text.nfkd()
        .filter(|&c| is_letter(c) || (keep_spaces && c.is_whitespace()))
        .collect()
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_only_strips_diacritics_and_punctuation() {
        assert_eq!(letters_only("Müller-Lüdenscheidt", false), "MullerLudenscheidt");
        assert_eq!(letters_only("Ó Dálaigh, 42", true), "O Dalaigh ");
        assert_eq!(letters_only("Jiménez", false), "Jimenez");
    }

    #[test]
    fn letters_include_non_latin_scripts() {
        assert!(is_letter('ж'));
        assert!(is_letter('名'));
        assert!(!is_letter('7'));
        assert!(!is_letter('\u{0301}'));
    }

    #[test]
    fn collapse_whitespace_trims_and_joins() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
