use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;

use crate::db::CandidateSource;
use crate::links::{check_links, is_doi_link};
use crate::matching::{CandidateScan, MatchOutcome};
use crate::rate_limit::search_with_rate_limit;
use crate::text_utils::is_letter;
use crate::{
    Config, CoreError, Finding, FindingKind, ParsedReference, ProgressEvent, Reference,
    ReferenceReport,
};

/// Checks individual references against links and bibliographic sources.
pub struct Checker {
    config: Arc<Config>,
    client: reqwest::Client,
    sources: Vec<Arc<dyn CandidateSource>>,
}

impl Checker {
    pub fn new(config: Config) -> Result<Self, CoreError> {
        let user_agent = match &config.mailto {
            Some(mailto) => format!("refcheck/{} (mailto:{})", env!("CARGO_PKG_VERSION"), mailto),
            None => format!("refcheck/{}", env!("CARGO_PKG_VERSION")),
        };
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: reqwest::Client) -> Self {
        let sources = config.build_sources();
        Self {
            config: Arc::new(config),
            client,
            sources,
        }
    }

    /// Validate links, search sources when warranted, and collect findings.
    pub async fn check_reference(&self, reference: Reference) -> ReferenceReport {
        let link_checks =
            check_links(&reference.links, &self.client, self.config.link_timeout()).await;

        let mut report = ReferenceReport {
            reference,
            link_checks,
            searched: false,
            matched: None,
            candidates_seen: 0,
            source_errors: vec![],
            findings: vec![],
        };

        let invalid: Vec<&str> = report
            .link_checks
            .iter()
            .filter(|c| !c.reachable)
            .map(|c| c.url.as_str())
            .collect();
        let links_ok = invalid.is_empty();
        if !links_ok {
            report.findings.push(Finding::new(
                FindingKind::InvalidLink,
                format!("Invalid DOI or URL: {}", invalid.join(", ")),
            ));
        }

        if self.config.links_only {
            return report;
        }

        let links = &report.reference.links;
        if !links.is_empty() && !links.iter().all(|l| is_doi_link(l)) {
            return report;
        }

        let parsed = &report.reference.parsed;
        if links.is_empty() && !parsed.title.chars().any(is_letter) {
            report.findings.push(Finding::new(
                FindingKind::Bogus,
                "No venue information and no links",
            ));
            return report;
        }

        let (outcome, source_errors) = self.search(parsed).await;
        let mut findings = outcome.findings(parsed);
        if !links.is_empty() && links_ok {
            findings.retain(|f| f.kind != FindingKind::NotFound);
        }

        report.searched = true;
        report.candidates_seen = outcome.examined;
        report.matched = outcome.matched;
        report.source_errors = source_errors;
        report.findings.extend(findings);
        report
    }

    /// Query sources in order, stopping once a clean match is found.
    /// Failed sources contribute no candidates.
    async fn search(&self, parsed: &ParsedReference) -> (MatchOutcome, Vec<(String, String)>) {
        let mut scan = CandidateScan::new(parsed, self.config.title_match);
        let mut errors = Vec::new();

        for source in &self.sources {
            if scan.is_done() {
                break;
            }
            match search_with_rate_limit(
                source.as_ref(),
                &parsed.title,
                &self.client,
                self.config.search_timeout(),
                &self.config.rate_limiters,
            )
            .await
            {
                Ok(candidates) => {
                    tracing::debug!(
                        source = source.name(),
                        title = %parsed.title,
                        count = candidates.len(),
                        "search complete"
                    );
                    scan.feed(candidates);
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name(),
                        title = %parsed.title,
                        error = %e,
                        "search failed"
                    );
                    errors.push((source.name().to_string(), e.to_string()));
                }
            }
        }

        (scan.finish(), errors)
    }
}

/// Check a list of references with bounded concurrency, preserving order.
///
/// Progress events are emitted via the callback. References that have not
/// completed when `cancel` fires are left out of the result.
pub async fn check_references(
    refs: Vec<Reference>,
    config: Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Result<Vec<ReferenceReport>, CoreError> {
    let total = refs.len();
    if total == 0 {
        return Ok(vec![]);
    }

    let concurrency = config.max_concurrent_refs.max(1);
    let checker = Checker::new(config)?;
    let checker = &checker;
    let progress = &progress;

    let reports: Vec<Option<ReferenceReport>> = stream::iter(refs.into_iter().enumerate())
        .map(|(index, reference)| {
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                progress(ProgressEvent::Checking {
                    index,
                    total,
                    title: reference.parsed.title.clone(),
                });

                let report = tokio::select! {
                    _ = cancel.cancelled() => return None,
                    report = checker.check_reference(reference) => report,
                };

                for (source, message) in &report.source_errors {
                    progress(ProgressEvent::SourceFailed {
                        index,
                        source: source.clone(),
                        message: message.clone(),
                    });
                }
                progress(ProgressEvent::Result {
                    index,
                    total,
                    report: Box::new(report.clone()),
                });
                Some(report)
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    Ok(reports.into_iter().flatten().collect())
}
