use super::{CandidateSource, SearchFuture, SourceError, phrase_query};
use crate::matching::order_retracted_first;
use crate::rate_limit::check_rate_limit_response;
use crate::text_utils::collapse_whitespace;
use crate::{ARXIV, BibliographicCandidate};
use std::time::Duration;

const QUERY_URL: &str = "http://export.arxiv.org/api/query";
const MAX_RESULTS: usize = 10;

/// arXiv preprint search. Withdrawn preprints are reported as retracted.
pub struct Arxiv;

impl CandidateSource for Arxiv {
    fn name(&self) -> &str {
        ARXIV
    }

    fn search<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> SearchFuture<'a> {
        Box::pin(async move {
            let query = format!("ti:\"{}\"", phrase_query(title));
            let url = format!(
                "{}?search_query={}&start=0&max_results={}",
                QUERY_URL,
                urlencoding::encode(&query),
                MAX_RESULTS
            );

            let resp = client.get(&url).timeout(timeout).send().await?;

            check_rate_limit_response(&resp)?;
            if !resp.status().is_success() {
                return Err(SourceError::Other(format!("HTTP {}", resp.status())));
            }

            let body = resp.text().await?;
            parse_arxiv_response(&body)
        })
    }
}

#[derive(Default)]
struct Entry {
    title: String,
    authors: Vec<String>,
    published: String,
    journal_ref: String,
    comment: String,
    summary: String,
}

impl Entry {
    fn is_withdrawn(&self) -> bool {
        let comment = self.comment.to_lowercase();
        let summary = self.summary.to_lowercase();
        comment.contains("withdrawn") || summary.contains("has been withdrawn")
    }

    fn into_candidate(self) -> BibliographicCandidate {
        let is_retracted = self.is_withdrawn();
        let year = self
            .published
            .trim()
            .get(..4)
            .and_then(|y| y.parse::<i32>().ok());
        let venue = collapse_whitespace(&self.journal_ref);
        BibliographicCandidate {
            title: collapse_whitespace(&self.title),
            year,
            authors: self.authors,
            venue: Some(if venue.is_empty() { ARXIV.to_string() } else { venue }),
            is_retracted,
            source: ARXIV.to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Title,
    Name,
    Published,
    JournalRef,
    Comment,
    Summary,
}

/// Parse an arXiv Atom feed into candidates, withdrawn entries first.
pub(crate) fn parse_arxiv_response(xml: &str) -> Result<Vec<BibliographicCandidate>, SourceError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);

    let mut candidates = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut field = Field::None;
    let mut current_name = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                match (local.as_ref(), entry.is_some()) {
                    (b"entry", _) => entry = Some(Entry::default()),
                    (b"title", true) => field = Field::Title,
                    (b"author", true) => {
                        in_author = true;
                        current_name.clear();
                    }
                    (b"name", true) if in_author => field = Field::Name,
                    (b"published", true) => field = Field::Published,
                    (b"journal_ref", true) => field = Field::JournalRef,
                    (b"comment", true) => field = Field::Comment,
                    (b"summary", true) => field = Field::Summary,
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(entry) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default();
                    match field {
                        Field::Title => entry.title.push_str(&text),
                        Field::Name => current_name.push_str(&text),
                        Field::Published => entry.published.push_str(&text),
                        Field::JournalRef => entry.journal_ref.push_str(&text),
                        Field::Comment => entry.comment.push_str(&text),
                        Field::Summary => entry.summary.push_str(&text),
                        Field::None => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(done) = entry.take() {
                        candidates.push(done.into_candidate());
                    }
                    field = Field::None;
                }
                b"author" => {
                    if let Some(entry) = entry.as_mut() {
                        let name = current_name.trim();
                        if !name.is_empty() {
                            entry.authors.push(name.to_string());
                        }
                    }
                    in_author = false;
                }
                _ => field = Field::None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Other(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    order_retracted_first(&mut candidates);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=ti:"attention"</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:comment>15 pages, 5 figures</arxiv:comment>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1234.5678v2</id>
    <published>2012-01-02T00:00:00Z</published>
    <title>A Withdrawn Result</title>
    <summary>This paper has been withdrawn by the author due to an error.</summary>
    <author><name>Jane Roe</name></author>
    <arxiv:journal_ref>J. Foo 3 (2012)</arxiv:journal_ref>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_with_withdrawn_first() {
        let cands = parse_arxiv_response(FEED).unwrap();
        assert_eq!(cands.len(), 2);

        assert_eq!(cands[0].title, "A Withdrawn Result");
        assert!(cands[0].is_retracted);
        assert_eq!(cands[0].venue.as_deref(), Some("J. Foo 3 (2012)"));

        assert_eq!(cands[1].title, "Attention Is All You Need");
        assert_eq!(cands[1].year, Some(2017));
        assert_eq!(cands[1].authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(cands[1].venue.as_deref(), Some(ARXIV));
        assert!(!cands[1].is_retracted);
    }

    #[test]
    fn feed_title_is_not_an_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Query</title></feed>"#;
        assert!(parse_arxiv_response(xml).unwrap().is_empty());
    }

    #[test]
    fn withdrawn_comment_is_detected() {
        let entry = Entry {
            comment: "This submission has been Withdrawn".into(),
            ..Entry::default()
        };
        assert!(entry.is_withdrawn());
    }
}
