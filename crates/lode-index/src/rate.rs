//! Inter-batch throttle bookkeeping.
//!
//! The delay grows with the total number of successful requests in the run:
//! once `max_requests_per_window` is reached, every further batch waits
//! `window_seconds * requests / max_requests_per_window`. The counter is never
//! reset, so the delay never shrinks within one run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub window_seconds: u64,
    pub max_requests_per_window: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests_per_window: 500,
        }
    }
}

/// Throttle state owned by one indexing run.
#[derive(Debug, Clone)]
pub struct RateWindow {
    limit: RateLimit,
    requests_made: u64,
    window_start: Instant,
}

impl RateWindow {
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            requests_made: 0,
            window_start: Instant::now(),
        }
    }

    #[must_use]
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    #[must_use]
    pub fn requests_made(&self) -> u64 {
        self.requests_made
    }

    #[must_use]
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Count one request that reached the service and succeeded.
    pub fn record_request(&mut self) {
        self.requests_made += 1;
    }

    /// Delay to apply before the next request.
    #[must_use]
    pub fn sleep_duration(&self) -> Duration {
        sleep_for(self.limit, self.requests_made)
    }
}

/// `window_seconds * requests / max` (in milliseconds) once `requests`
/// reaches `max`, zero before that. A zero `max` disables throttling.
#[must_use]
pub fn sleep_for(limit: RateLimit, requests: u64) -> Duration {
    let max = limit.max_requests_per_window;
    if max == 0 || requests < max {
        return Duration::ZERO;
    }
    let millis = limit
        .window_seconds
        .saturating_mul(1000)
        .saturating_mul(requests)
        / max;
    Duration::from_millis(millis)
}
