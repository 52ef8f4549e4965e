//! Sliding-window rate limiter shared by all cluster workers.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Permits at most `max_calls` acquisitions in any window of length `period`.
///
/// Callers over the limit are delayed until the oldest acquisition in the
/// window expires; they are never rejected.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. A `max_calls` of zero is treated as one.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            period,
            granted: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for a slot in the current window.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut granted = self.granted.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = granted.front() {
                    if now.duration_since(oldest) >= self.period {
                        granted.pop_front();
                    } else {
                        break;
                    }
                }

                if granted.len() < self.max_calls {
                    granted.push_back(now);
                    return;
                }

                match granted.front() {
                    Some(&oldest) => self.period - now.duration_since(oldest),
                    None => Duration::ZERO,
                }
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}
