use std::path::Path;

use refcheck_core::{Reference, SpanSource, TextSpan};

use crate::config::ParsingConfig;
use crate::fields::parse_fields;
use crate::identifiers::find_links;
use crate::layout::document_lines;
use crate::sanitize::sanitize;
use crate::segment::ReferenceSegmenter;
use crate::ParsingError;

/// A configurable reference extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use
/// [`ReferenceExtractor::with_config`] to inject a dictionary or heading words.
pub struct ReferenceExtractor {
    config: ParsingConfig,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParsingConfig::default(),
        }
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Rebuild logical lines from per-page spans (step 1).
    pub fn lines_from_pages(&self, pages: Vec<Vec<TextSpan>>) -> impl Iterator<Item = String> {
        document_lines(pages)
    }

    /// Group logical lines into accent-fixed raw entries (steps 2 and 3).
    pub fn segment<I>(&self, lines: I) -> ReferenceSegmenter<'_, I>
    where
        I: Iterator<Item = String>,
    {
        ReferenceSegmenter::new(lines, &self.config)
    }

    /// Sanitize one raw entry and pull out its links and fields (step 4).
    ///
    /// `number` is the entry's 1-based position in the document.
    pub fn parse_reference(&self, raw: &str, number: usize) -> Reference {
        let citation = sanitize(raw);
        Reference {
            links: find_links(&citation),
            parsed: parse_fields(&citation, self.config.current_year()),
            raw_citation: citation,
            original_number: number,
        }
    }

    /// Run the pipeline on spans that were already extracted.
    pub fn extract_from_pages(&self, pages: Vec<Vec<TextSpan>>) -> Vec<Reference> {
        self.segment(self.lines_from_pages(pages))
            .enumerate()
            .map(|(i, raw)| self.parse_reference(&raw, i + 1))
            .collect()
    }

    /// Extract spans from `path` with `backend`, then run the pipeline.
    pub fn extract_references_via_backend(
        &self,
        path: &Path,
        backend: &dyn SpanSource,
    ) -> Result<Vec<Reference>, ParsingError> {
        let pages = backend.extract_pages(path)?;
        let span_count: usize = pages.iter().map(Vec::len).sum();
        let refs = self.extract_from_pages(pages);
        tracing::debug!(
            path = %path.display(),
            spans = span_count,
            references = refs.len(),
            "extracted references"
        );
        Ok(refs)
    }
}
