//! Repair of diacritics that the extractor emitted as free-standing
//! spacing marks next to their base letter (`e´` instead of `é`).

use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::UnicodeNormalization;

/// Combining mark equivalent of a spacing diacritic, e.g. `´` → U+0301.
///
/// Only modifier symbols and modifier letters qualify. Their Unicode name is
/// rewritten to the `COMBINING ...` name and looked up again; characters
/// with no combining counterpart yield `None`.
pub fn combining_form(c: char) -> Option<char> {
    if !matches!(
        get_general_category(c),
        GeneralCategory::ModifierSymbol | GeneralCategory::ModifierLetter
    ) {
        return None;
    }
    let name = unicode_names2::name(c)?.to_string();
    let base = name.strip_prefix("MODIFIER LETTER ").unwrap_or(&name);
    let base = base.strip_prefix("COMBINING ").unwrap_or(base);
    unicode_names2::character(&format!("COMBINING {base}"))
}

fn is_tilde_like(c: char) -> bool {
    !c.is_ascii()
        && unicode_names2::name(c)
            .map(|n| n.to_string().contains("TILDE"))
            .unwrap_or(false)
}

/// Incremental matcher for the `http://` / `https://` prefix.
#[derive(Debug, Default)]
struct UrlPrefix {
    progress: usize,
}

impl UrlPrefix {
    /// Feed one character; returns true once a full prefix has been seen.
    fn advance(&mut self, c: char) -> bool {
        let expected: &[char] = match self.progress {
            0 => &['h'],
            1 | 2 => &['t'],
            3 => &['p'],
            4 => &['s', ':'],
            5 => &[':'],
            6 | 7 => &['/'],
            _ => &[],
        };
        if expected.contains(&c) {
            // "http:" skips the 's' step
            self.progress = match (self.progress, c) {
                (4, ':') => 6,
                (p, _) => p + 1,
            };
        } else {
            self.progress = usize::from(c == 'h');
        }
        if self.progress == 8 {
            self.progress = 0;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.progress = 0;
    }
}

/// Compose detached diacritics with the character that follows them.
///
/// Inside an `http(s)://` run nothing is composed, and tilde look-alikes are
/// turned back into `~`. A diacritic at the very end of the input has no
/// base character and is dropped.
pub fn fix_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prefix = UrlPrefix::default();
    let mut in_url = false;
    let mut pending: Option<char> = None;

    for c in text.chars() {
        if c.is_whitespace() {
            in_url = false;
            prefix.reset();
        } else if prefix.advance(c) {
            in_url = true;
        }

        if in_url {
            if let Some(mark) = pending.take() {
                out.push(mark);
            }
            out.push(if is_tilde_like(c) { '~' } else { c });
            continue;
        }

        if let Some(mark) = pending.take() {
            out.extend([c, mark].into_iter().nfc());
            continue;
        }

        match combining_form(c) {
            Some(mark) => pending = Some(mark),
            None => out.push(c),
        }
    }

    out
}
