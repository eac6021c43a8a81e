//! Normalization applied to every reference entry before field extraction.

/// Typographic double quotes mapped to `"`.
const DOUBLE_QUOTES: [char; 6] = ['\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}', '\u{AB}', '\u{BB}'];

/// Replace typographic double quotes with `"` and collapse runs of spaces.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(entry: &str) -> String {
    let mut out = String::with_capacity(entry.len());
    for c in entry.chars() {
        let c = if DOUBLE_QUOTES.contains(&c) { '"' } else { c };
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_quotes() {
        assert_eq!(
            sanitize("A. Ortega, \u{201C}Cacao,\u{201D} \u{AB}x\u{BB} \u{201E}y\u{201F}"),
            "A. Ortega, \"Cacao,\" \"x\" \"y\""
        );
    }

    #[test]
    fn collapses_spaces_but_not_other_whitespace() {
        assert_eq!(sanitize("a  b     c"), "a b c");
        assert_eq!(sanitize("a\t\tb"), "a\t\tb");
        assert_eq!(sanitize("trailing   "), "trailing ");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "[1]Mystakidis, Stylianos. \"Metaverse.\" Encyclopedia 2, no.  1 (2022): 486-497. ",
            "  \u{201C}quoted\u{201D}   text  ",
            "",
            "   ",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once);
        }
    }
}
