//! Grouping of logical lines into bracket-numbered reference entries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::accents::fix_accents;
use crate::config::ParsingConfig;
use crate::dictionary::Dictionary;

/// Accumulated text ending inside a bare URL.
static OPEN_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?:(//\S*)?$").unwrap());

static TRAILING_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)-$").unwrap());

static LEADING_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// What to do with a hyphen that ends a wrapped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyphenDecision {
    Keep,
    Drop,
}

fn is_known(dictionary: &dyn Dictionary, word: &str) -> bool {
    dictionary.contains(word)
        || dictionary.contains(&word.to_lowercase())
        || dictionary.contains(&word.to_uppercase())
}

/// Decide the fate of the hyphen between `first` (the word before it) and
/// `last` (the word starting the next line).
///
/// Hyphens stay when either fragment is missing or not purely alphabetic, or
/// when `last` is capitalised. Otherwise the hyphen goes if the joined word
/// is known, stays if both halves are known words, and goes by default.
pub fn hyphen_decision(
    first: Option<&str>,
    last: Option<&str>,
    dictionary: &dyn Dictionary,
) -> HyphenDecision {
    let (Some(first), Some(last)) = (first, last) else {
        return HyphenDecision::Keep;
    };
    let alphabetic = |w: &str| w.chars().all(char::is_alphabetic);
    if !alphabetic(first) || !alphabetic(last) {
        return HyphenDecision::Keep;
    }
    if last.chars().next().is_some_and(char::is_uppercase) {
        return HyphenDecision::Keep;
    }

    if is_known(dictionary, &format!("{first}{last}")) {
        HyphenDecision::Drop
    } else if is_known(dictionary, first) && is_known(dictionary, last) {
        HyphenDecision::Keep
    } else {
        HyphenDecision::Drop
    }
}

/// Append a continuation line to the entry being accumulated.
pub fn merge_line(entry: &mut String, line: &str, dictionary: &dyn Dictionary) {
    if OPEN_URL_RE.is_match(entry) {
        // Prose resuming after a URL that ended a sentence.
        if entry.ends_with('.') && line.chars().next().is_some_and(char::is_uppercase) {
            entry.push(' ');
        }
        entry.push_str(line);
        return;
    }

    if entry.ends_with('-') {
        let first = TRAILING_WORD_RE
            .captures(entry)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        let last = LEADING_WORD_RE.find(line).map(|m| m.as_str());
        if hyphen_decision(first, last, dictionary) == HyphenDecision::Drop {
            entry.pop();
        }
        entry.push_str(line);
        return;
    }

    entry.push(' ');
    entry.push_str(line);
}

enum Phase {
    SeekingHeading,
    Collecting,
    Done,
}

/// Lazily yields raw reference entries (each starting with `[`) from a
/// stream of logical lines.
///
/// Lines up to and including the bibliography heading are skipped. When no
/// heading is found the whole document is treated as reference content:
/// every line read while seeking is held in memory and replayed, so in that
/// case the segmenter buffers the entire document rather than one entry.
/// Lines before the first `[` are dropped. Each entry is accent-fixed once,
/// when it is complete.
pub struct ReferenceSegmenter<'a, I> {
    lines: I,
    config: &'a ParsingConfig,
    phase: Phase,
    replay: std::vec::IntoIter<String>,
    current: Option<String>,
}

impl<'a, I> ReferenceSegmenter<'a, I>
where
    I: Iterator<Item = String>,
{
    pub fn new(lines: I, config: &'a ParsingConfig) -> Self {
        Self {
            lines,
            config,
            phase: Phase::SeekingHeading,
            replay: Vec::new().into_iter(),
            current: None,
        }
    }

    fn seek_heading(&mut self) {
        let mut skipped = Vec::new();
        for line in self.lines.by_ref() {
            if self.config.is_heading(line.trim()) {
                tracing::debug!(heading = line.trim(), skipped = skipped.len(), "found bibliography heading");
                return;
            }
            skipped.push(line);
        }
        tracing::debug!(lines = skipped.len(), "no bibliography heading, scanning whole document");
        self.replay = skipped.into_iter();
    }

    fn next_line(&mut self) -> Option<String> {
        self.replay.next().or_else(|| self.lines.next())
    }
}

impl<I> Iterator for ReferenceSegmenter<'_, I>
where
    I: Iterator<Item = String>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.phase {
            Phase::Done => return None,
            Phase::SeekingHeading => {
                self.seek_heading();
                self.phase = Phase::Collecting;
            }
            Phase::Collecting => {}
        }

        while let Some(line) = self.next_line() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                if let Some(done) = self.current.replace(line.to_string()) {
                    return Some(fix_accents(&done));
                }
                continue;
            }
            if let Some(entry) = self.current.as_mut() {
                merge_line(entry, line, self.config.dictionary());
            }
        }

        self.phase = Phase::Done;
        self.current.take().map(|entry| fix_accents(&entry))
    }
}
