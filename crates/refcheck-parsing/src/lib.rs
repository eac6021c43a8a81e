use std::path::Path;

use thiserror::Error;

pub mod accents;
pub mod config;
pub mod dictionary;
pub mod extractor;
pub mod fields;
pub mod identifiers;
pub mod layout;
pub mod sanitize;
pub mod segment;

pub use config::{ListOverride, ParsingConfig, ParsingConfigBuilder};
pub use dictionary::{Dictionary, DictionaryError, WordList};
pub use extractor::ReferenceExtractor;
pub use segment::{HyphenDecision, ReferenceSegmenter, hyphen_decision};
// Re-export domain types from core (canonical definitions live there)
pub use refcheck_core::{BackendError, ParsedReference, Reference, SpanSource, TextSpan};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("invalid heading pattern: {0}")]
    Config(#[from] regex::Error),
}

/// Extract references from a PDF file using the given backend for spans.
///
/// Pipeline:
/// 1. Extract positioned spans per page via `backend`
/// 2. Rebuild logical lines from span geometry
/// 3. Skip to the bibliography heading and group lines into `[n]` entries,
///    joining wrapped URLs and hyphenated words, then repair accents
/// 4. Sanitize each entry and extract links, authors, title and year
pub fn extract_references(
    pdf_path: &Path,
    backend: &dyn SpanSource,
) -> Result<Vec<Reference>, ParsingError> {
    ReferenceExtractor::new().extract_references_via_backend(pdf_path, backend)
}
