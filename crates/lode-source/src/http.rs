//! HTTP client and rate-limit handling for the GitHub API.
//!
//! GitHub signals exhaustion two ways: a plain 429, or a 403 whose
//! `x-ratelimit-remaining` header is `0`. Both are retried after the delay the
//! server asks for (`retry-after`, then `x-ratelimit-reset`), falling back to
//! doubling from one second. Only the fallback is capped; a reset far in the
//! future is waited out in full.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use crate::error::SourceError;

const FIRST_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// # Panics
///
/// Panics if the TLS backend cannot be initialized (should never happen with rustls).
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(60))
        .user_agent(concat!("lode/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

pub(crate) fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && header_u64(headers, "x-ratelimit-remaining") == Some(0))
}

/// Wait requested by the server, or the back-off for `attempt` (0-based).
pub(crate) fn wait_for(headers: &HeaderMap, attempt: u32, now_epoch: u64) -> Duration {
    let requested = header_u64(headers, "retry-after")
        .map(Duration::from_secs)
        .or_else(|| {
            header_u64(headers, "x-ratelimit-reset")
                .map(|reset| Duration::from_secs(reset.saturating_sub(now_epoch)))
        });
    requested.unwrap_or_else(|| {
        FIRST_BACKOFF
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    })
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Issue the request built by `send`, waiting out rate limits up to
/// `max_retries` times. Any other response is handed back untouched.
///
/// # Errors
///
/// [`SourceError::RateLimited`] once retries run out, [`SourceError::Http`]
/// on transport failure.
pub(crate) async fn send_with_retry<F, Fut>(
    path: &str,
    max_retries: u32,
    mut send: F,
) -> Result<reqwest::Response, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut retries = 0;
    loop {
        let response = send().await?;
        if !is_rate_limited(response.status(), response.headers()) {
            return Ok(response);
        }
        if retries >= max_retries {
            return Err(SourceError::RateLimited);
        }
        let wait = wait_for(response.headers(), retries, now_epoch());
        retries += 1;
        tracing::warn!(
            path,
            status = response.status().as_u16(),
            retry = retries,
            max_retries,
            wait_secs = wait.as_secs(),
            "GitHub rate limit hit"
        );
        tokio::time::sleep(wait).await;
    }
}
