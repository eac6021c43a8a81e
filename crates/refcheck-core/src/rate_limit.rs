//! Per-source rate limiting with adaptive governor instances.
//!
//! Each search waits for its governor permit via `until_ready()`, which
//! spaces requests at the configured rate. On 429 the governor is slowed,
//! the Retry-After delay is honored and the search is retried once.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::db::{CandidateSource, SourceError};
use crate::{ARXIV, BibliographicCandidate, OPENALEX};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const MAX_SLOWDOWN: u32 = 16;
const DECAY_AFTER: Duration = Duration::from_secs(60);

fn quota_for(period: Duration) -> Quota {
    Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}

/// Per-source limiter with adaptive rate adjustment via ArcSwap.
///
/// A 429 swaps in a slower governor (factor doubles, capped at 16x).
/// After 60s without a 429 the base rate is restored.
pub struct AdaptiveLimiter {
    limiter: ArcSwap<DirectLimiter>,
    base_period: Duration,
    current_factor: AtomicU32,
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl AdaptiveLimiter {
    pub fn new(period: Duration) -> Self {
        let limiter = Arc::new(DirectLimiter::direct(quota_for(period)));
        Self {
            limiter: ArcSwap::from(limiter),
            base_period: period,
            current_factor: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    pub fn per_second(n: u32) -> Self {
        let ms = 1000 / n.max(1) as u64;
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the governor allows a request.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }

        let _ = self
            .current_factor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(MAX_SLOWDOWN))
            });

        let factor = self.current_factor.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(scaled))));
        }
    }

    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed() >= DECAY_AFTER))
            .unwrap_or(false);

        if should_restore && self.current_factor.load(Ordering::SeqCst) > 1 {
            self.current_factor.store(1, Ordering::SeqCst);
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(self.base_period))));
        }
    }
}

/// Collection of per-source rate limiters, shared across concurrent checks.
pub struct RateLimiters {
    limiters: HashMap<&'static str, AdaptiveLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiters {
    pub fn new() -> Self {
        let mut limiters = HashMap::new();

        // OpenAlex: light governor so adaptive backoff kicks in on 429
        limiters.insert(OPENALEX, AdaptiveLimiter::per_second(10));

        // arXiv API: 3/s
        limiters.insert(ARXIV, AdaptiveLimiter::per_second(3));

        Self { limiters }
    }

    pub fn get(&self, source_name: &str) -> Option<&AdaptiveLimiter> {
        self.limiters.get(source_name)
    }
}

/// Returns `Err(SourceError::RateLimited { .. })` if the response is a 429.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), SourceError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(SourceError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: use a conservative fixed wait
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Search a source behind its governor.
///
/// On 429 the governor is slowed, the Retry-After delay (capped at
/// `timeout`) is slept and the search is retried once.
pub async fn search_with_rate_limit(
    source: &dyn CandidateSource,
    title: &str,
    client: &reqwest::Client,
    timeout: Duration,
    rate_limiters: &RateLimiters,
) -> Result<Vec<BibliographicCandidate>, SourceError> {
    let limiter = rate_limiters.get(source.name());

    if let Some(lim) = limiter {
        lim.acquire().await;
    }

    match source.search(title, client, timeout).await {
        Err(SourceError::RateLimited { retry_after }) => {
            if let Some(lim) = limiter {
                lim.on_rate_limited();
            }

            let wait = retry_after.unwrap_or(Duration::from_secs(2)).min(timeout);
            tracing::info!(
                source = source.name(),
                wait_secs = wait.as_secs_f64(),
                "rate limited, retrying once"
            );
            tokio::time::sleep(wait).await;

            if let Some(lim) = limiter {
                lim.acquire().await;
            }
            source.search(title, client, timeout).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{MockResponse, MockSource};

    // ── parse_retry_after ──────────────────────────────────────────────

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::from_secs(0)));
    }

    #[test]
    fn parse_http_date_gmt() {
        let val = "Wed, 21 Oct 2015 07:28:00 GMT";
        assert_eq!(parse_retry_after(val), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_garbage_none() {
        assert_eq!(parse_retry_after("xyz"), None);
    }

    // ── check_rate_limit_response ──────────────────────────────────────

    #[test]
    fn ok_on_200() {
        let http_resp = http::Response::builder().status(200).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(check_rate_limit_response(&resp).is_ok());
    }

    #[test]
    fn rate_limited_429_with_retry_after() {
        let http_resp = http::Response::builder()
            .status(429)
            .header("retry-after", "10")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert_eq!(
            check_rate_limit_response(&resp),
            Err(SourceError::RateLimited {
                retry_after: Some(Duration::from_secs(10))
            })
        );
    }

    // ── AdaptiveLimiter ────────────────────────────────────────────────

    #[test]
    fn on_rate_limited_doubles_and_caps() {
        let limiter = AdaptiveLimiter::per_second(10);
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 1);
        limiter.on_rate_limited();
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 2);
        for _ in 0..10 {
            limiter.on_rate_limited();
        }
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn decay_restores_after_60s() {
        let limiter = AdaptiveLimiter::per_second(10);
        limiter.on_rate_limited();
        limiter.on_rate_limited();
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 4);

        {
            let mut last = limiter.last_429.lock().unwrap();
            *last = Some(Instant::now() - Duration::from_secs(61));
        }

        limiter.acquire().await;
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn limiters_exist_for_builtin_sources() {
        let limiters = RateLimiters::default();
        assert!(limiters.get(OPENALEX).is_some());
        assert!(limiters.get(ARXIV).is_some());
        assert!(limiters.get("Nowhere").is_none());
    }

    // ── search_with_rate_limit ────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retries_once() {
        let source = MockSource::new(
            OPENALEX,
            MockResponse::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            },
        );
        let client = reqwest::Client::new();
        let limiters = RateLimiters::new();

        let result = search_with_rate_limit(
            &source,
            "A Paper",
            &client,
            Duration::from_secs(10),
            &limiters,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(source.call_count(), 2);
        assert_eq!(
            limiters
                .get(OPENALEX)
                .unwrap()
                .current_factor
                .load(Ordering::SeqCst),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_429_can_succeed() {
        let source = MockSource::with_sequence(
            "TestSource",
            vec![
                MockResponse::RateLimited { retry_after: None },
                MockResponse::Candidates(vec![]),
            ],
        );
        let client = reqwest::Client::new();
        let result = search_with_rate_limit(
            &source,
            "A Paper",
            &client,
            Duration::from_secs(10),
            &RateLimiters::new(),
        )
        .await;
        assert_eq!(result, Ok(vec![]));
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_error_no_retry() {
        let source = MockSource::new("TestSource", MockResponse::Error("connection refused".into()));
        let client = reqwest::Client::new();

        let result = search_with_rate_limit(
            &source,
            "A Paper",
            &client,
            Duration::from_secs(10),
            &RateLimiters::new(),
        )
        .await;

        assert_eq!(result, Err(SourceError::Other("connection refused".into())));
        assert_eq!(source.call_count(), 1);
    }
}
