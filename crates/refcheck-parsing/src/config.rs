use std::sync::Arc;

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dictionary::{Dictionary, WordList};

/// Words that announce the bibliography when they end a line.
pub const DEFAULT_HEADING_WORDS: &[&str] = &["references", "bibliography"];

static DEFAULT_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| heading_regex(DEFAULT_HEADING_WORDS).unwrap());

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Configuration for the reference extraction pipeline.
///
/// Use [`ParsingConfigBuilder`] to change the heading words or inject a
/// dictionary.
#[derive(Clone)]
pub struct ParsingConfig {
    pub(crate) heading_re: Regex,
    pub(crate) dictionary: Arc<dyn Dictionary>,
    /// Fixed "current year" for the year window; `None` reads the clock.
    pub(crate) current_year: Option<i32>,
}

impl std::fmt::Debug for ParsingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsingConfig")
            .field("heading_re", &self.heading_re.as_str())
            .field("current_year", &self.current_year)
            .finish_non_exhaustive()
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            heading_re: DEFAULT_HEADING_RE.clone(),
            dictionary: empty_dictionary(),
            current_year: None,
        }
    }
}

impl ParsingConfig {
    pub fn current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    pub fn dictionary(&self) -> &dyn Dictionary {
        self.dictionary.as_ref()
    }

    /// Whether `line` (already trimmed) is the bibliography heading.
    pub fn is_heading(&self, line: &str) -> bool {
        self.heading_re.is_match(line)
    }
}

fn empty_dictionary() -> Arc<dyn Dictionary> {
    Arc::new(WordList::default())
}

fn heading_regex<S: AsRef<str>>(words: &[S]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w.as_ref())).collect();
    Regex::new(&format!(r"(?i)(?:^|\W)(?:{})$", alternatives.join("|")))
}

/// Builder for [`ParsingConfig`].
#[derive(Default)]
pub struct ParsingConfigBuilder {
    heading_words: ListOverride<String>,
    dictionary: Option<Arc<dyn Dictionary>>,
    current_year: Option<i32>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_heading_words(mut self, words: Vec<String>) -> Self {
        self.heading_words = ListOverride::Replace(words);
        self
    }

    pub fn add_heading_word(mut self, word: impl Into<String>) -> Self {
        match &mut self.heading_words {
            ListOverride::Extend(v) => v.push(word.into()),
            _ => self.heading_words = ListOverride::Extend(vec![word.into()]),
        }
        self
    }

    pub fn dictionary(mut self, dictionary: Arc<dyn Dictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    /// Compile the heading pattern from the resolved word list.
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let defaults: Vec<String> = DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect();
        let words = self.heading_words.resolve(&defaults);
        Ok(ParsingConfig {
            heading_re: heading_regex(&words)?,
            dictionary: self.dictionary.unwrap_or_else(empty_dictionary),
            current_year: self.current_year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_heading_matches_at_line_end() {
        let config = ParsingConfig::default();
        assert!(config.is_heading("References"));
        assert!(config.is_heading("7 REFERENCES"));
        assert!(config.is_heading("Bibliography"));
        assert!(!config.is_heading("References and notes"));
        assert!(!config.is_heading("Introduction"));
        assert!(!config.is_heading("User Preferences"));
        assert!(!config.is_heading("as ranked by our preferences"));
    }

    #[test]
    fn builder_extends_heading_words() {
        let config = ParsingConfigBuilder::new()
            .add_heading_word("Works Cited")
            .build()
            .unwrap();
        assert!(config.is_heading("Works cited"));
        assert!(config.is_heading("References"));
    }

    #[test]
    fn builder_replaces_heading_words() {
        let config = ParsingConfigBuilder::new()
            .set_heading_words(vec!["Literatur".into()])
            .build()
            .unwrap();
        assert!(config.is_heading("Literatur"));
        assert!(!config.is_heading("References"));
    }

    #[test]
    fn heading_words_are_literal() {
        let config = ParsingConfigBuilder::new()
            .set_heading_words(vec!["Refs.".into()])
            .build()
            .unwrap();
        assert!(config.is_heading("Refs."));
        assert!(!config.is_heading("Refsx"));
    }

    #[test]
    fn fixed_current_year() {
        let config = ParsingConfigBuilder::new().current_year(2026).build().unwrap();
        assert_eq!(config.current_year(), 2026);
    }

    #[test]
    fn injected_dictionary_is_used() {
        let config = ParsingConfigBuilder::new()
            .dictionary(Arc::new(WordList::from_words(["cacao"])))
            .build()
            .unwrap();
        assert!(config.dictionary().contains("cacao"));
        assert!(!ParsingConfig::default().dictionary().contains("cacao"));
    }
}
