//! Sliding-window admission control.
//!
//! One limiter instance is shared by every request to the process. The
//! window is a lock-guarded deque of admission timestamps: entries older
//! than the window are pruned before each decision, and a denied request
//! never mutates the window. State is not persisted; the limiter resets on
//! restart.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Admission decision. `count` is the number of requests in the current
/// window including this one when allowed, excluding it when denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed { count: usize },
    Denied { count: usize, limit: usize },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Clone)]
pub struct SlidingWindowLimiter {
    window: Duration,
    limit: usize,
    admitted: Arc<Mutex<VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            admitted: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Decide admission for a request arriving now.
    pub async fn check(&self) -> Decision {
        self.check_at(Instant::now()).await
    }

    /// Decide admission at an explicit instant. The lock is held across
    /// prune and decision so concurrent checks cannot admit past the limit.
    pub async fn check_at(&self, now: Instant) -> Decision {
        let mut admitted = self.admitted.lock().await;

        while let Some(oldest) = admitted.front() {
            let expired = now
                .checked_duration_since(*oldest)
                .is_some_and(|age| age >= self.window);
            if expired {
                admitted.pop_front();
            } else {
                break;
            }
        }

        let count = admitted.len();
        if count < self.limit {
            admitted.push_back(now);
            tracing::trace!(count = count + 1, limit = self.limit, "request admitted");
            Decision::Allowed { count: count + 1 }
        } else {
            tracing::trace!(count, limit = self.limit, "request denied by rate limit");
            Decision::Denied {
                count,
                limit: self.limit,
            }
        }
    }
}
