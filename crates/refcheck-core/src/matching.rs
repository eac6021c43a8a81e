//! Title/author/year comparison between a parsed reference and search candidates.

use crate::text_utils::{collapse_whitespace, letters_only};
use crate::{BibliographicCandidate, Finding, FindingKind, ParsedReference};

/// How titles are compared when filtering candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleMatchMode {
    /// Compare letters only: diacritics, punctuation, digits and case are ignored.
    #[default]
    Normalized,
    /// Compare the raw strings, case-sensitive, with whitespace runs collapsed.
    Strict,
}

/// Normalize a title for comparison: lowercase letters only.
///
/// `"Über-Fast Sorting (2nd ed.)"` becomes `"uberfastsortingnded"`.
pub fn normalize_title(title: &str) -> String {
    letters_only(&title.to_lowercase(), false)
}

/// Whether two titles are the same under `mode`. Empty titles never match.
pub fn titles_equal(expected: &str, found: &str, mode: TitleMatchMode) -> bool {
    match mode {
        TitleMatchMode::Normalized => {
            let expected = normalize_title(expected);
            !expected.is_empty() && expected == normalize_title(found)
        }
        TitleMatchMode::Strict => {
            let expected = collapse_whitespace(expected);
            !expected.is_empty() && expected == collapse_whitespace(found)
        }
    }
}

/// A candidate survives the title filter when its title equals the expected
/// one, or when it looks retracted (retraction notices often rewrite titles).
pub fn passes_title_filter(
    expected_title: &str,
    candidate: &BibliographicCandidate,
    mode: TitleMatchMode,
) -> bool {
    candidate.looks_retracted() || titles_equal(expected_title, &candidate.title, mode)
}

/// Stable reordering that moves retracted candidates to the front.
pub fn order_retracted_first(candidates: &mut [BibliographicCandidate]) {
    candidates.sort_by_key(|c| !c.looks_retracted());
}

/// Expected author last names that appear in none of the candidate's authors.
///
/// Candidate names are reduced to letters and spaces before a
/// case-insensitive substring test.
pub fn missing_authors(expected: &[String], candidate_authors: &[String]) -> Vec<String> {
    let haystack: Vec<String> = candidate_authors
        .iter()
        .map(|a| letters_only(a, true).to_lowercase())
        .collect();
    expected
        .iter()
        .filter(|author| {
            let needle = author.to_lowercase();
            !haystack.iter().any(|a| a.contains(&needle))
        })
        .cloned()
        .collect()
}

/// The retained result of scanning candidates for one reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Last candidate that passed the title filter.
    pub matched: Option<BibliographicCandidate>,
    pub missing_authors: Vec<String>,
    pub year_matches: bool,
    /// Some passing candidate was retracted or withdrawn.
    pub retracted: bool,
    /// Number of candidates examined before the scan stopped.
    pub examined: usize,
    /// Most similar rejected title and its similarity in `[0, 1]`.
    pub closest: Option<(String, f64)>,
}

impl MatchOutcome {
    /// Translate the outcome into findings for the reference it was computed for.
    pub fn findings(&self, parsed: &ParsedReference) -> Vec<Finding> {
        let Some(matched) = &self.matched else {
            let mut message = format!(
                "Could not find title \"{}\" in published sources",
                parsed.title
            );
            if let Some((closest, score)) = &self.closest {
                message.push_str(&format!(
                    "; closest was \"{}\" ({:.0}% similar)",
                    closest,
                    score * 100.0
                ));
            }
            return vec![Finding::new(FindingKind::NotFound, message)];
        };

        let mut findings = Vec::new();
        if self.retracted {
            findings.push(Finding::new(
                FindingKind::FoundRetracted,
                format!(
                    "Matched publication \"{}\" has been retracted or withdrawn",
                    matched.title
                ),
            ));
        }
        if let Some(year) = parsed.year
            && !self.year_matches
        {
            let found = matched
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "none".to_string());
            findings.push(Finding::new(
                FindingKind::FoundYearMismatch,
                format!("Could not find year {year} in published sources (found {found})"),
            ));
        }
        if !self.missing_authors.is_empty() {
            findings.push(Finding::new(
                FindingKind::FoundAuthorsMissing,
                format!(
                    "Could not find authors {} in published sources",
                    self.missing_authors.join(", ")
                ),
            ));
        }
        findings
    }
}

/// Incremental candidate scan.
///
/// Candidates can be fed in batches (one per source); the scan stops at the
/// first passing candidate with every expected author present and a
/// matching (or absent) year. The comparison of the last passing candidate
/// seen is what the outcome reports.
pub struct CandidateScan<'a> {
    parsed: &'a ParsedReference,
    mode: TitleMatchMode,
    normalized_title: String,
    outcome: MatchOutcome,
    done: bool,
}

impl<'a> CandidateScan<'a> {
    pub fn new(parsed: &'a ParsedReference, mode: TitleMatchMode) -> Self {
        Self {
            parsed,
            mode,
            normalized_title: normalize_title(&parsed.title),
            outcome: MatchOutcome::default(),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Examine candidates in order. Returns `true` once a clean match was found.
    pub fn feed<I>(&mut self, candidates: I) -> bool
    where
        I: IntoIterator<Item = BibliographicCandidate>,
    {
        for candidate in candidates {
            if self.done {
                break;
            }
            self.outcome.examined += 1;

            if !passes_title_filter(&self.parsed.title, &candidate, self.mode) {
                self.note_rejected(&candidate.title);
                continue;
            }

            let missing = missing_authors(&self.parsed.authors, &candidate.authors);
            let year_matches = match self.parsed.year {
                Some(year) => candidate.year == Some(year),
                None => false,
            };
            self.outcome.retracted |= candidate.looks_retracted();
            self.done = missing.is_empty() && (self.parsed.year.is_none() || year_matches);

            tracing::trace!(
                title = %candidate.title,
                source = %candidate.source,
                missing = missing.len(),
                year_matches,
                "candidate passed title filter"
            );

            self.outcome.missing_authors = missing;
            self.outcome.year_matches = year_matches;
            self.outcome.matched = Some(candidate);
        }
        self.done
    }

    fn note_rejected(&mut self, title: &str) {
        let normalized = normalize_title(title);
        if normalized.is_empty() || self.normalized_title.is_empty() {
            return;
        }
        let score = rapidfuzz::fuzz::ratio(self.normalized_title.chars(), normalized.chars());
        let better = self
            .outcome
            .closest
            .as_ref()
            .is_none_or(|(_, best)| score > *best);
        if better {
            self.outcome.closest = Some((title.to_string(), score));
        }
    }

    pub fn finish(self) -> MatchOutcome {
        self.outcome
    }
}

/// Scan a complete candidate sequence in one go.
pub fn match_candidates<I>(
    parsed: &ParsedReference,
    candidates: I,
    mode: TitleMatchMode,
) -> MatchOutcome
where
    I: IntoIterator<Item = BibliographicCandidate>,
{
    let mut scan = CandidateScan::new(parsed, mode);
    scan.feed(candidates);
    scan.finish()
}
