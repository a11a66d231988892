//! Shared HTTP client construction for embedding backends.

use std::time::Duration;

/// Create the HTTP client used for embedding requests.
///
/// Config: 30s connect timeout, 120s request timeout (large batches are
/// slow), rustls TLS, `lode/{version}` user-agent.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized (should never happen with rustls).
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("lode/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}
