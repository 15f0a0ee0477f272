//! Per-peer token-bucket rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    enabled: bool,
    rps: f64,
    burst: f64,
    buckets: HashMap<IpAddr, TokenBucket>,
}

/// Rate limiter shared by all connections of a server.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                enabled: config.enabled,
                rps: config.requests_per_second as f64,
                burst: config.burst_size as f64,
                buckets: HashMap::new(),
            }),
        }
    }

    /// Apply new limits. Existing buckets are dropped so peers start full.
    pub fn reconfigure(&self, config: &RateLimitConfig) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.enabled = config.enabled;
        state.rps = config.requests_per_second as f64;
        state.burst = config.burst_size as f64;
        state.buckets.clear();
    }

    /// Take one token for `peer`. Returns false when the peer is over its limit.
    pub fn check(&self, peer: IpAddr) -> bool {
        self.check_at(peer, Instant::now())
    }

    fn check_at(&self, peer: IpAddr, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.enabled {
            return true;
        }
        let (burst, rps) = (state.burst, state.rps);
        let allowed = state
            .buckets
            .entry(peer)
            .or_insert_with(|| TokenBucket::new(burst))
            .try_acquire(burst, rps, now);

        if !allowed {
            tracing::warn!(client = %peer, "Rate limit exceeded");
            metrics::record_rate_limited();
        }
        allowed
    }
}
