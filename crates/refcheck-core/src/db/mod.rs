//! Bibliographic sources that can be searched by title.

pub mod arxiv;
pub mod mock;
pub mod openalex;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::BibliographicCandidate;

/// Error type for source queries, distinguishing rate limiting from other errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Server returned 429 Too Many Requests.
    RateLimited { retry_after: Option<Duration> },
    /// Any other error.
    Other(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (429), retry after {:.1}s", d.as_secs_f64()),
            SourceError::RateLimited { retry_after: None } => write!(f, "rate limited (429)"),
            SourceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Other(e.to_string())
    }
}

/// Boxed future returned by [`CandidateSource::search`].
pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<BibliographicCandidate>, SourceError>> + Send + 'a>>;

/// A bibliographic source that can be searched for an exact title phrase.
///
/// Implementations return candidates in the order the matcher should see
/// them: retracted or withdrawn records first, otherwise in source order.
pub trait CandidateSource: Send + Sync {
    /// The canonical name of this source (e.g., "OpenAlex", "arXiv").
    fn name(&self) -> &str;

    fn search<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> SearchFuture<'a>;
}

/// Reduce a title to a phrase that is safe inside a quoted search query.
pub(crate) fn phrase_query(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_query_drops_quotes_and_punctuation() {
        assert_eq!(
            phrase_query("\"BERT: Pre-training of deep transformers\", for NLP."),
            "BERT Pre-training of deep transformers for NLP"
        );
    }

    #[test]
    fn rate_limited_display_includes_retry_after() {
        let err = SourceError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(err.to_string(), "rate limited (429), retry after 3.0s");
        let err = SourceError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limited (429)");
    }
}
