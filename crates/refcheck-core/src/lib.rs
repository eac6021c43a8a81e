use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod backend;
pub mod checker;
pub mod config_file;
pub mod db;
pub mod links;
pub mod matching;
pub mod rate_limit;
pub mod text_utils;

// Re-export for convenience
pub use backend::{BackendError, SpanSource};
pub use db::{CandidateSource, SourceError};
pub use links::LinkCheck;
pub use matching::{MatchOutcome, TitleMatchMode, match_candidates};
pub use rate_limit::RateLimiters;

/// Axis-aligned rectangle in page coordinates. `top < bottom` (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// True when the two boxes share some vertical extent, i.e. they sit on
    /// the same visual line.
    pub fn overlaps_vertically(&self, other: &BoundingBox) -> bool {
        self.top < other.bottom && self.bottom > other.top
    }
}

/// A positioned fragment of page text as produced by the PDF extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Fields recovered from one sanitized reference string.
///
/// `year`, when present, lies in `(current_year - 100, current_year]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReference {
    /// Author last names in citation order, diacritics stripped.
    pub authors: Vec<String>,
    pub title: String,
    pub year: Option<i32>,
    /// Text following the title (venue, pages, year, ...).
    pub remainder: String,
}

/// A reference extracted from a document, ready to be checked.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Sanitized reference text, starting with its `[n]` marker.
    pub raw_citation: String,
    pub parsed: ParsedReference,
    pub links: Vec<String>,
    /// 1-based position in the document's reference list.
    pub original_number: usize,
}

/// A bibliographic record returned by an external search.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographicCandidate {
    pub title: String,
    pub year: Option<i32>,
    /// Display names as returned by the source.
    pub authors: Vec<String>,
    pub venue: Option<String>,
    /// Retracted (journal record) or withdrawn (preprint).
    pub is_retracted: bool,
    /// Name of the source that produced this candidate.
    pub source: String,
}

impl BibliographicCandidate {
    /// Flagged retracted by the source, or carrying a retraction notice in its title.
    pub fn looks_retracted(&self) -> bool {
        self.is_retracted || self.title.to_lowercase().contains("retracted")
    }
}

/// Outcome tag attached to a checked reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    /// No candidate passed the title filter.
    NotFound,
    FoundRetracted,
    FoundYearMismatch,
    FoundAuthorsMissing,
    /// At least one link in the reference did not resolve.
    InvalidLink,
    /// Neither title text nor links: nothing to verify.
    Bogus,
}

impl FindingKind {
    pub fn label(&self) -> &'static str {
        match self {
            FindingKind::NotFound => "NOT FOUND",
            FindingKind::FoundRetracted => "RETRACTED",
            FindingKind::FoundYearMismatch => "YEAR MISMATCH",
            FindingKind::FoundAuthorsMissing => "AUTHORS MISSING",
            FindingKind::InvalidLink => "INVALID LINK",
            FindingKind::Bogus => "BOGUS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The result of checking a single reference.
#[derive(Debug, Clone)]
pub struct ReferenceReport {
    pub reference: Reference,
    pub link_checks: Vec<LinkCheck>,
    /// Whether external sources were consulted for this reference.
    pub searched: bool,
    /// The candidate whose comparison produced the final outcome.
    pub matched: Option<BibliographicCandidate>,
    pub candidates_seen: usize,
    /// `(source, error)` for every source query that failed.
    pub source_errors: Vec<(String, String)>,
    pub findings: Vec<Finding>,
}

impl ReferenceReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }
}

/// Progress events emitted during checking.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        index: usize,
        total: usize,
        title: String,
    },
    Result {
        index: usize,
        total: usize,
        report: Box<ReferenceReport>,
    },
    SourceFailed {
        index: usize,
        source: String,
        message: String,
    },
}

/// Summary counts for a checked document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub total: usize,
    pub clean: usize,
    pub not_found: usize,
    pub retracted: usize,
    pub year_mismatch: usize,
    pub authors_missing: usize,
    pub invalid_link: usize,
    pub bogus: usize,
}

impl CheckStats {
    pub fn from_reports(reports: &[ReferenceReport]) -> Self {
        let mut stats = CheckStats {
            total: reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.is_clean() {
                stats.clean += 1;
            }
            for finding in &report.findings {
                match finding.kind {
                    FindingKind::NotFound => stats.not_found += 1,
                    FindingKind::FoundRetracted => stats.retracted += 1,
                    FindingKind::FoundYearMismatch => stats.year_mismatch += 1,
                    FindingKind::FoundAuthorsMissing => stats.authors_missing += 1,
                    FindingKind::InvalidLink => stats.invalid_link += 1,
                    FindingKind::Bogus => stats.bogus += 1,
                }
            }
        }
        stats
    }

    pub fn problems(&self) -> usize {
        self.total - self.clean
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config_file::ConfigError),
}

/// Names of the built-in bibliographic sources.
pub const OPENALEX: &str = "OpenAlex";
pub const ARXIV: &str = "arXiv";

/// Configuration for the reference checker.
#[derive(Clone)]
pub struct Config {
    pub openalex_key: Option<String>,
    /// Contact address sent to OpenAlex (polite pool) and in the User-Agent.
    pub mailto: Option<String>,
    /// Source names (case-insensitive) that must not be queried.
    pub disabled_sources: Vec<String>,
    pub search_timeout_secs: u64,
    pub link_timeout_secs: u64,
    pub max_concurrent_refs: usize,
    pub title_match: TitleMatchMode,
    /// Only validate links; never query bibliographic sources.
    pub links_only: bool,
    pub rate_limiters: Arc<RateLimiters>,
    /// Overrides the built-in source list when set.
    pub sources: Option<Vec<Arc<dyn CandidateSource>>>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openalex_key", &self.openalex_key.as_ref().map(|_| "***"))
            .field("mailto", &self.mailto)
            .field("disabled_sources", &self.disabled_sources)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("link_timeout_secs", &self.link_timeout_secs)
            .field("max_concurrent_refs", &self.max_concurrent_refs)
            .field("title_match", &self.title_match)
            .field("links_only", &self.links_only)
            .field(
                "sources",
                &self
                    .sources
                    .as_ref()
                    .map(|s| s.iter().map(|src| src.name().to_string()).collect::<Vec<_>>()),
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openalex_key: None,
            mailto: None,
            disabled_sources: vec![],
            search_timeout_secs: 10,
            link_timeout_secs: 10,
            max_concurrent_refs: 4,
            title_match: TitleMatchMode::Normalized,
            links_only: false,
            rate_limiters: Arc::new(RateLimiters::default()),
            sources: None,
        }
    }
}

impl Config {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.link_timeout_secs)
    }

    pub fn is_source_enabled(&self, name: &str) -> bool {
        !self
            .disabled_sources
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    }

    /// The sources to query, primary first.
    pub fn build_sources(&self) -> Vec<Arc<dyn CandidateSource>> {
        let all: Vec<Arc<dyn CandidateSource>> = match &self.sources {
            Some(custom) => custom.clone(),
            None => vec![
                Arc::new(db::openalex::OpenAlex {
                    api_key: self.openalex_key.clone(),
                    mailto: self.mailto.clone(),
                }),
                Arc::new(db::arxiv::Arxiv),
            ],
        };
        all.into_iter()
            .filter(|s| self.is_source_enabled(s.name()))
            .collect()
    }
}

/// Check a list of references against links and bibliographic sources.
///
/// References are checked concurrently (bounded by `max_concurrent_refs`)
/// and results come back in input order. Cancelling stops references that
/// have not finished; reports already produced are returned.
pub async fn check_references(
    refs: Vec<Reference>,
    config: Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Result<Vec<ReferenceReport>, CoreError> {
    checker::check_references(refs, config, progress, cancel).await
}
