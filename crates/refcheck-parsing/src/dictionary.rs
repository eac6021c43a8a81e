//! Word-existence capability used when deciding whether to keep a line-break hyphen.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default system word list on Unix-like systems.
pub const SYSTEM_WORDS: &str = "/usr/share/dict/words";

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Answers whether a word exists. Implementations must be pure: the same
/// word always yields the same answer.
pub trait Dictionary: Send + Sync {
    fn contains(&self, word: &str) -> bool;
}

impl<F> Dictionary for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn contains(&self, word: &str) -> bool {
        self(word)
    }
}

/// An in-memory, case-preserving set of words.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a one-word-per-line file. Blank lines are ignored.
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::from_words(
            content
                .lines()
                .map(str::trim)
                .filter(|w| !w.is_empty()),
        );
        tracing::debug!(path = %path.display(), words = list.len(), "loaded word list");
        Ok(list)
    }

    /// The system word list, if one is installed.
    pub fn system() -> Option<Self> {
        let path = Path::new(SYSTEM_WORDS);
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(error = %e, "system word list unreadable");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}
