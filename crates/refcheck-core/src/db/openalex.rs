use super::{CandidateSource, SearchFuture, SourceError, phrase_query};
use crate::matching::order_retracted_first;
use crate::rate_limit::check_rate_limit_response;
use crate::{BibliographicCandidate, OPENALEX};
use std::time::Duration;

const WORKS_URL: &str = "https://api.openalex.org/works";
const PER_PAGE: usize = 25;

pub struct OpenAlex {
    pub api_key: Option<String>,
    pub mailto: Option<String>,
}

impl OpenAlex {
    fn search_url(&self, title: &str) -> String {
        let phrase = format!("\"{}\"", phrase_query(title));
        let mut url = format!(
            "{}?search={}&per-page={}",
            WORKS_URL,
            urlencoding::encode(&phrase),
            PER_PAGE
        );
        if let Some(key) = &self.api_key {
            url.push_str("&api_key=");
            url.push_str(&urlencoding::encode(key));
        }
        if let Some(mailto) = &self.mailto {
            url.push_str("&mailto=");
            url.push_str(&urlencoding::encode(mailto));
        }
        url
    }
}

impl CandidateSource for OpenAlex {
    fn name(&self) -> &str {
        OPENALEX
    }

    fn search<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> SearchFuture<'a> {
        Box::pin(async move {
            let url = self.search_url(title);
            let resp = client.get(&url).timeout(timeout).send().await?;

            check_rate_limit_response(&resp)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SourceError::Other(format!("HTTP {}", status)));
            }

            let data: serde_json::Value = resp.json().await?;
            Ok(parse_openalex_response(&data))
        })
    }
}

/// Map an OpenAlex `/works` response to candidates, retracted first.
pub(crate) fn parse_openalex_response(data: &serde_json::Value) -> Vec<BibliographicCandidate> {
    let results = data["results"].as_array().cloned().unwrap_or_default();

    let mut candidates: Vec<BibliographicCandidate> = results
        .iter()
        .filter_map(|item| {
            let title = item["title"].as_str()?.replace('\n', " ");
            let authors = item["authorships"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|a| a["author"]["display_name"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            Some(BibliographicCandidate {
                title,
                year: item["publication_year"]
                    .as_i64()
                    .and_then(|y| i32::try_from(y).ok()),
                authors,
                venue: item["primary_location"]["source"]["display_name"]
                    .as_str()
                    .map(String::from),
                is_retracted: item["is_retracted"].as_bool().unwrap_or(false),
                source: OPENALEX.to_string(),
            })
        })
        .collect();

    order_retracted_first(&mut candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_works_and_orders_retracted_first() {
        let data = json!({
            "meta": {"count": 2},
            "results": [
                {
                    "title": "Deep learning",
                    "publication_year": 2015,
                    "authorships": [
                        {"author": {"display_name": "Yann LeCun"}},
                        {"author": {"display_name": "Yoshua Bengio"}}
                    ],
                    "primary_location": {"source": {"display_name": "Nature"}},
                    "is_retracted": false
                },
                {
                    "title": "Deep learning\nrevisited",
                    "publication_year": 2019,
                    "authorships": [],
                    "primary_location": null,
                    "is_retracted": true
                },
                {"title": null, "publication_year": 2001}
            ]
        });
        let cands = parse_openalex_response(&data);
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].title, "Deep learning revisited");
        assert!(cands[0].is_retracted);
        assert_eq!(cands[0].venue, None);
        assert_eq!(cands[1].year, Some(2015));
        assert_eq!(cands[1].authors, vec!["Yann LeCun", "Yoshua Bengio"]);
        assert_eq!(cands[1].venue.as_deref(), Some("Nature"));
        assert_eq!(cands[1].source, OPENALEX);
    }

    #[test]
    fn empty_response_yields_no_candidates() {
        assert!(parse_openalex_response(&json!({})).is_empty());
    }

    #[test]
    fn search_url_quotes_phrase_and_appends_credentials() {
        let source = OpenAlex {
            api_key: Some("k3y".into()),
            mailto: Some("me@example.org".into()),
        };
        let url = source.search_url("Attention is all you need.");
        assert!(url.starts_with("https://api.openalex.org/works?search=%22Attention%20is%20all%20you%20need%22"));
        assert!(url.contains("&api_key=k3y"));
        assert!(url.contains("&mailto=me%40example.org"));
    }
}
