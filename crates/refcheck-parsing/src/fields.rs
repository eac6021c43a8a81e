//! Author, title and year extraction from one sanitized reference string.
//!
//! Every function here degrades instead of failing: an unrecognised layout
//! yields a boundary of 0, no year or an empty author list.

use once_cell::sync::Lazy;
use regex::Regex;

use refcheck_core::ParsedReference;
use refcheck_core::text_utils::letters_only;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ (](\d{4})(?:[ ),;.]|$)").unwrap());

static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\]\s*").unwrap());

static AUTHOR_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r", | and ").unwrap());

/// Anything outside ASCII letters and hyphen marks a name the extractor mangled.
static CORRUPT_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[^a-z-]").unwrap());

const NAME_STOPLIST: &[&str] = &["et", "al", "al.", "et.", "others"];

fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

/// Whether the `.` at byte `dot` closes an author initial rather than the
/// author list.
///
/// Walks back over the uppercase run before the dot. The run is an initial
/// when it is preceded (spaces skipped) by nothing, a comma, a `]` or the
/// word "and". A preceding `.` means chained initials (`M. J.`), and the
/// walk continues from there.
fn ends_with_initial(text: &str, dot: usize) -> bool {
    let mut pos = dot;
    loop {
        let run_start = text[..pos]
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_uppercase())
            .last()
            .map(|(i, _)| i);
        let Some(run_start) = run_start else {
            return false;
        };

        let head = text[..run_start].trim_end_matches(' ');
        match head.chars().next_back() {
            None | Some(',') | Some(']') => return true,
            _ if head.ends_with("and") => return true,
            Some('.') => pos = head.len() - 1,
            Some(_) => return false,
        }
    }
}

/// Whether the text following a comma reads like the start of a title.
pub fn looks_like_title(text: &str) -> bool {
    let text = text.trim();
    if text.starts_with('"') {
        return true;
    }
    let Some(first_word) = text.split_whitespace().next() else {
        return false;
    };
    if first_word.contains(':') {
        return true;
    }
    if text.starts_with("and") {
        return false;
    }
    if text.chars().next().is_some_and(char::is_lowercase) {
        return true;
    }
    text.split_whitespace().count() >= 3
}

/// Byte offset where the author list ends and the title begins.
pub fn find_end_of_authors(text: &str) -> usize {
    if let Some(idx) = text.find(" \"") {
        return idx;
    }

    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(". ") {
        let dot = search_from + offset;
        search_from = dot + 2;

        if ends_with_initial(text, dot) {
            continue;
        }

        let end = dot + 2;
        // Another initial follows, so the author list goes on.
        let next_is_initial = text[end..]
            .find(". ")
            .is_some_and(|next| char_before(text, end + next).is_some_and(char::is_uppercase));
        if next_is_initial {
            continue;
        }
        let rest = &text[end..];
        if ["and ", "et ", "& "].iter().any(|p| rest.starts_with(p)) {
            continue;
        }
        return end;
    }

    // Comma-separated styles: the first comma followed by something title-like.
    text.match_indices(',')
        .map(|(i, _)| i + 1)
        .find(|&after| looks_like_title(&text[after..]))
        .unwrap_or(0)
}

/// Split the title from what follows it. Returns `(title, remainder)`.
pub fn extract_possible_title(text: &str) -> (String, String) {
    let mut rest = text[find_end_of_authors(text)..].trim();

    // Year-before-title styles: "(2022, Mar 21). Title..."
    if rest.starts_with('(') {
        if let Some(close) = rest.find(')') {
            rest = rest[close + 1..]
                .trim_start_matches([',', '.', ':', ';'])
                .trim();
        }
    }

    if let Some(body) = rest.strip_prefix('"') {
        // The closing quote is the first one not preceded by whitespace, which
        // skips quotes opening an embedded phrase.
        let close = body
            .char_indices()
            .find(|&(i, c)| c == '"' && !char_before(body, i).is_some_and(char::is_whitespace))
            .map(|(i, _)| i);
        return match close {
            Some(close) => (
                clean_title(&body[..close]),
                body[close + 1..].trim_start_matches([',', '.']).trim().to_string(),
            ),
            None => (clean_title(body), String::new()),
        };
    }

    match rest.find(". ") {
        Some(period) => (
            rest[..period].trim().to_string(),
            rest[period + 2..].trim().to_string(),
        ),
        None => (rest.trim_end_matches('.').to_string(), rest.to_string()),
    }
}

fn clean_title(raw: &str) -> String {
    raw.trim_end_matches(',')
        .trim_end_matches('.')
        .trim()
        .to_string()
}

/// First plausible publication year: four digits after a space or `(`,
/// followed by a delimiter or the end, within `(current_year - 100, current_year]`.
pub fn extract_possible_year(text: &str, current_year: i32) -> Option<i32> {
    YEAR_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .find(|&y| current_year - 100 < y && y <= current_year)
}

/// Author last names, diacritics stripped, in citation order.
pub fn extract_possible_author_last_names(text: &str) -> Vec<String> {
    let end = find_end_of_authors(text);
    let list = text[..end]
        .trim()
        .trim_end_matches(',')
        .trim_end_matches('.');
    let list = MARKER_RE.replace(list, "");

    let mut names = Vec::new();
    for author in AUTHOR_SPLIT_RE.split(&list) {
        let author = author.trim();
        if author.is_empty() {
            continue;
        }
        // Reached the date or page numbers.
        if author.chars().any(char::is_numeric) {
            break;
        }
        let Some(last) = author.split(' ').rev().find(|w| is_name_part(w)) else {
            continue;
        };
        if NAME_STOPLIST.contains(&last) || CORRUPT_NAME_RE.is_match(last) {
            continue;
        }
        names.push(letters_only(last, false));
    }
    names
}

/// Capitalised, not all caps, longer than one character, no initials.
fn is_name_part(word: &str) -> bool {
    word.chars().count() > 1
        && !word.contains('.')
        && word.chars().next().is_some_and(char::is_uppercase)
        && word.chars().any(char::is_lowercase)
}

/// Parse a sanitized reference. The year is looked for after the title.
pub fn parse_fields(text: &str, current_year: i32) -> ParsedReference {
    let (title, remainder) = extract_possible_title(text);
    ParsedReference {
        authors: extract_possible_author_last_names(text),
        year: extract_possible_year(&remainder, current_year),
        title,
        remainder,
    }
}
