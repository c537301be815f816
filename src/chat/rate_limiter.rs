//! Per-caller fixed-window request limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::domain::Clock;

/// Bucket count above which expired buckets are pruned on access.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    first: DateTime<Utc>,
    count: u32,
}

/// Counts requests per caller key within a window anchored at the bucket's
/// first request.
///
/// A request arriving once the window has elapsed since that first request
/// starts a new window. Within a window, requests past `max_requests` are
/// refused and not counted. One limiter is shared by every request of the
/// process.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl SlidingWindowLimiter {
    /// Creates a limiter allowing `max_requests` per `window` per key.
    #[must_use]
    pub fn new(max_requests: u32, window: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request for `key`; `false` when the key is over its budget.
    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() > PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, b| now - b.first < window);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert(Bucket { first: now, count: 0 });
        if bucket.count == 0 || now - bucket.first >= self.window {
            *bucket = Bucket { first: now, count: 1 };
            return true;
        }
        if bucket.count >= self.max_requests {
            return false;
        }
        bucket.count += 1;
        true
    }

    /// Seconds a refused caller is told to wait.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        u64::try_from(self.window.num_seconds()).unwrap_or(0)
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
