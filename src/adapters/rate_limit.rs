//! Request Pacing
//!
//! Per-service limiter shared by every request an HTTP adapter makes, so
//! concurrent callers still respect the minimum spacing towards one host.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Minimum-interval limiter with an optional per-minute cap
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum gap between two requests
    min_interval: Duration,
    /// Maximum requests per minute (0 = no cap)
    rpm_limit: u32,
    /// Timestamp of last request
    last_request: Option<Instant>,
    /// Requests made in current window
    requests_in_window: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, rpm_limit: u32) -> Self {
        Self {
            min_interval,
            rpm_limit,
            last_request: None,
            requests_in_window: 0,
            window_start: Instant::now(),
        }
    }

    /// Only enforce spacing between requests
    pub fn with_interval(min_interval: Duration) -> Self {
        Self::new(min_interval, 0)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// How long to wait before the next request may go out
    pub fn check_rate_limit(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.window_start);

        if elapsed >= Duration::from_secs(60) {
            self.window_start = now;
            self.requests_in_window = 0;
        }

        if self.rpm_limit > 0 && self.requests_in_window >= self.rpm_limit {
            return Some(Duration::from_secs(60).saturating_sub(elapsed));
        }

        let since_last = self.last_request.map(|t| now.duration_since(t))?;
        if since_last < self.min_interval {
            return Some(self.min_interval - since_last);
        }

        None
    }

    /// Record that a request was made
    pub fn record_request(&mut self) {
        self.last_request = Some(Instant::now());
        self.requests_in_window += 1;
    }

    /// Wait until a request can be made, then record it
    pub async fn wait_if_needed(&mut self) {
        while let Some(wait) = self.check_rate_limit() {
            tokio::time::sleep(wait).await;
        }
        self.record_request();
    }
}

/// Shared handle to one service's limiter
pub type SharedRateLimiter = Arc<Mutex<RateLimiter>>;

pub fn shared(limiter: RateLimiter) -> SharedRateLimiter {
    Arc::new(Mutex::new(limiter))
}
