//! Reachability checks for URLs and DOI links found in references.

use std::borrow::Cow;
use std::time::Duration;

use futures_util::future::join_all;

pub const DOI_ORG_PREFIX: &str = "https://doi.org/";
/// The DOI handle API answers 404 for unregistered DOIs instead of an HTML page.
pub const DOI_HANDLE_API: &str = "https://doi.org/api/handles/";

/// Outcome of requesting one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheck {
    pub url: String,
    pub reachable: bool,
    /// Final HTTP status, if a response was received at all.
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// The URL actually requested for `url`: doi.org links go to the handle API.
pub fn resolution_url(url: &str) -> Cow<'_, str> {
    match url.strip_prefix(DOI_ORG_PREFIX) {
        Some(doi) => Cow::Owned(format!("{DOI_HANDLE_API}{doi}")),
        None => Cow::Borrowed(url),
    }
}

/// 403 counts as reachable: publishers commonly refuse scripted clients.
pub fn is_reachable_status(status: u16) -> bool {
    status < 400 || status == 403
}

/// Whether a link points at a DOI. References whose links are all DOIs are
/// still searched by title.
pub fn is_doi_link(url: &str) -> bool {
    url.contains("doi")
}

/// Request `url` (following redirects) and classify the final status.
/// Transport errors and timeouts count as unreachable.
pub async fn check_link(url: &str, client: &reqwest::Client, timeout: Duration) -> LinkCheck {
    let target = resolution_url(url);
    match client.get(target.as_ref()).timeout(timeout).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let reachable = is_reachable_status(status);
            tracing::debug!(url, status, reachable, "link checked");
            LinkCheck {
                url: url.to_string(),
                reachable,
                status: Some(status),
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "link request failed");
            LinkCheck {
                url: url.to_string(),
                reachable: false,
                status: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Check every link concurrently, preserving input order.
pub async fn check_links(urls: &[String], client: &reqwest::Client, timeout: Duration) -> Vec<LinkCheck> {
    join_all(urls.iter().map(|u| check_link(u, client, timeout))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `status` to every connection on an ephemeral localhost port.
    async fn serve_status(status: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/paper")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn doi_links_use_handle_api() {
        assert_eq!(
            resolution_url("https://doi.org/10.1145/3133956.3134093"),
            "https://doi.org/api/handles/10.1145/3133956.3134093"
        );
        assert_eq!(
            resolution_url("https://example.org/doi/10.1/x"),
            "https://example.org/doi/10.1/x"
        );
    }

    #[test]
    fn reachable_statuses() {
        assert!(is_reachable_status(200));
        assert!(is_reachable_status(302));
        assert!(is_reachable_status(403));
        assert!(!is_reachable_status(404));
        assert!(!is_reachable_status(500));
    }

    #[tokio::test]
    async fn ok_and_forbidden_are_reachable() {
        let client = client();
        for status in [200, 403] {
            let url = serve_status(status).await;
            let check = check_link(&url, &client, Duration::from_secs(5)).await;
            assert!(check.reachable, "status {status} should be reachable");
            assert_eq!(check.status, Some(status));
        }
    }

    #[tokio::test]
    async fn not_found_is_unreachable() {
        let url = serve_status(404).await;
        let check = check_link(&url, &client(), Duration::from_secs(5)).await;
        assert!(!check.reachable);
        assert_eq!(check.status, Some(404));
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let check = check_link(&format!("http://{addr}/"), &client(), Duration::from_secs(5)).await;
        assert!(!check.reachable);
        assert_eq!(check.status, None);
        assert!(check.error.is_some());
    }

    #[tokio::test]
    async fn check_links_preserves_order() {
        let ok = serve_status(200).await;
        let missing = serve_status(404).await;
        let checks = check_links(&[missing.clone(), ok.clone()], &client(), Duration::from_secs(5)).await;
        assert_eq!(checks[0].url, missing);
        assert!(!checks[0].reachable);
        assert_eq!(checks[1].url, ok);
        assert!(checks[1].reachable);
    }
}
