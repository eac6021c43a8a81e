use once_cell::sync::Lazy;
use regex::Regex;

/// Find every `http://` / `https://` link in a reference.
///
/// Trailing periods, then trailing commas, are stripped from each match.
/// Bare DOIs (`10.xxxx/...`) are not promoted to links.
pub fn find_links(reference: &str) -> Vec<String> {
    static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

    URL_RE
        .find_iter(reference)
        .map(|m| {
            m.as_str()
                .trim_end_matches('.')
                .trim_end_matches(',')
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_urls_and_strips_trailing_punctuation() {
        let text = "[6] Marr, B. Retrieved from forbes.com: https://www.forbes.com/sites/x/?sh=ae88. \
                    See also http://example.org/a, and more.";
        assert_eq!(
            find_links(text),
            vec![
                "https://www.forbes.com/sites/x/?sh=ae88".to_string(),
                "http://example.org/a".to_string(),
            ]
        );
    }

    #[test]
    fn doi_urls_are_links() {
        assert_eq!(
            find_links("Nature 521, 2015. https://doi.org/10.1038/nature14539."),
            vec!["https://doi.org/10.1038/nature14539".to_string()]
        );
    }

    #[test]
    fn bare_dois_are_ignored() {
        assert!(find_links("J. Foo, doi:10.1145/3133956.3134093, 2017.").is_empty());
    }

    #[test]
    fn comma_then_period_keeps_period() {
        assert_eq!(find_links("https://a.org/x.,"), vec!["https://a.org/x.".to_string()]);
    }
}
