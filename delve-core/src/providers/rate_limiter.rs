//! Client-side sliding-window rate limiting for retrieval backends.
//!
//! Proactively throttles outgoing search calls to stay within a
//! requests-per-minute budget instead of relying on backend backpressure.
//! One window per backend; the limiter is shared by every concurrent session.

use crate::types::SearchBackend;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;

/// Sliding one-minute request window for a single backend.
#[derive(Debug)]
struct RequestWindow {
    requests: VecDeque<Instant>,
    window: Duration,
}

impl RequestWindow {
    fn new() -> Self {
        Self {
            requests: VecDeque::new(),
            window: Duration::from_secs(60),
        }
    }

    fn prune(&mut self, now: Instant) {
        let cutoff = now - self.window;
        while self.requests.front().is_some_and(|t| *t < cutoff) {
            self.requests.pop_front();
        }
    }

    /// `None` if a request can proceed now, otherwise the delay to wait.
    fn check(&mut self, rpm: usize, now: Instant) -> Option<Duration> {
        if rpm == 0 {
            return None;
        }
        self.prune(now);
        if self.requests.len() >= rpm {
            if let Some(&oldest) = self.requests.front() {
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    return Some(wait);
                }
            }
        }
        None
    }

    fn record(&mut self, now: Instant) {
        self.requests.push_back(now);
    }
}

/// Per-backend rate limiter shared across sessions.
pub struct RateLimiter {
    /// Requests per minute per backend (0 = unlimited).
    rpm: usize,
    windows: Mutex<HashMap<SearchBackend, RequestWindow>>,
}

impl RateLimiter {
    pub fn new(rpm: usize) -> Self {
        Self {
            rpm,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(rpm: usize) -> Arc<Self> {
        Arc::new(Self::new(rpm))
    }

    /// Wait until a request slot for the backend is available, then claim it.
    pub async fn acquire(&self, backend: SearchBackend) {
        // Unlimited mode tracks nothing; recording would grow the window
        // unboundedly with no pruning pressure.
        if self.rpm == 0 {
            return;
        }
        loop {
            let delay = {
                let now = Instant::now();
                let mut windows = self.windows.lock().await;
                let window = windows.entry(backend).or_insert_with(RequestWindow::new);
                match window.check(self.rpm, now) {
                    None => {
                        window.record(now);
                        return;
                    }
                    Some(delay) => delay,
                }
            };
            trace!(%backend, ?delay, "rate limit reached, waiting");
            tokio::time::sleep(delay).await;
        }
    }

    /// Requests currently counted in the backend's window.
    pub async fn current_usage(&self, backend: SearchBackend) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        match windows.get_mut(&backend) {
            Some(window) => {
                window.prune(now);
                window.requests.len()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlimited_never_blocks() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            limiter.acquire(SearchBackend::Web).await;
        }
        assert_eq!(limiter.current_usage(SearchBackend::Web).await, 0);
    }

    #[tokio::test]
    async fn test_backends_tracked_independently() {
        let limiter = RateLimiter::new(10);
        limiter.acquire(SearchBackend::Web).await;
        limiter.acquire(SearchBackend::Web).await;
        limiter.acquire(SearchBackend::Academic).await;

        assert_eq!(limiter.current_usage(SearchBackend::Web).await, 2);
        assert_eq!(limiter.current_usage(SearchBackend::Academic).await, 1);
        assert_eq!(limiter.current_usage(SearchBackend::News).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_window_delays() {
        let limiter = RateLimiter::new(2);
        limiter.acquire(SearchBackend::Web).await;
        limiter.acquire(SearchBackend::Web).await;

        // Third acquire must wait for the window to roll; with paused time the
        // sleep is auto-advanced, so completion proves it waited rather than
        // spinning forever.
        let start = tokio::time::Instant::now();
        limiter.acquire(SearchBackend::Web).await;
        assert!(tokio::time::Instant::now() - start >= Duration::from_secs(59));
    }
}
