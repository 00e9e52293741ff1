//! Per-sender token-bucket rate limiting (§4.1, §8 property 6 / scenario S7).
//!
//! A bucket is refilled on each arrival, proportional to elapsed wall time
//! since the sender's last observation, rather than on a background timer —
//! this keeps the limiter cheap to hold one-per-`from` in a map without a
//! sweeping task.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::NodeId;

pub const DEFAULT_REFILL_PER_SEC: f64 = 100.0;
pub const DEFAULT_BURST: f64 = 1000.0;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("sender {0} exceeded its rate limit")]
    RateLimited(NodeId),
}

/// A single sender's bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        TokenBucket {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let added = elapsed.as_secs_f64() * self.refill_per_sec;
        if added > 0.0 {
            self.tokens = (self.tokens + added).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Attempt to withdraw one token, refilling first. Returns whether the
    /// withdrawal succeeded.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Tracks one `TokenBucket` per sending node id.
#[derive(Debug, Default)]
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: HashMap<NodeId, TokenBucket>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        TokenBucketLimiter {
            capacity,
            refill_per_sec,
            buckets: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BURST, DEFAULT_REFILL_PER_SEC)
    }

    /// Check whether `from` may send one more message right now.
    pub fn check(&mut self, from: &str) -> Result<(), RateLimitError> {
        let capacity = self.capacity;
        let refill_per_sec = self.refill_per_sec;
        let bucket = self
            .buckets
            .entry(from.to_owned())
            .or_insert_with(|| TokenBucket::new(capacity, refill_per_sec));
        if bucket.try_consume(Instant::now()) {
            Ok(())
        } else {
            Err(RateLimitError::RateLimited(from.to_owned()))
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_capacity_succeeds_then_limits() {
        let mut bucket = TokenBucket::new(3.0, 0.0);
        let now = Instant::now();
        assert!(bucket.try_consume(now));
        assert!(bucket.try_consume(now));
        assert!(bucket.try_consume(now));
        assert!(!bucket.try_consume(now));
    }

    #[test]
    fn refill_is_proportional_to_elapsed_time() {
        let mut bucket = TokenBucket::new(1.0, 10.0);
        let t0 = Instant::now();
        assert!(bucket.try_consume(t0));
        assert!(!bucket.try_consume(t0));
        let t1 = t0 + Duration::from_millis(150);
        assert!(bucket.try_consume(t1));
    }

    #[test]
    fn limiter_tracks_buckets_independently_per_sender() {
        let mut limiter = TokenBucketLimiter::new(1.0, 0.0);
        assert!(limiter.check("node-a").is_ok());
        assert!(limiter.check("node-a").is_err());
        assert!(limiter.check("node-b").is_ok());
        assert_eq!(limiter.bucket_count(), 2);
    }
}
