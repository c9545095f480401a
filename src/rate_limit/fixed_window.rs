use crate::clock::{Clock, SystemClock};
use crate::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
use crate::slot::LatestSlot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowCounter {
    count: u32,
    reset_at: u64,
}

/// In-memory fixed-window limiter keyed by caller identity.
///
/// Each key gets `max_requests` per window; the window starts with the key's
/// first request and ends `window` later. Expired counters are swept on every
/// check, so memory tracks the number of keys seen within one window.
///
/// # Examples
/// ```
/// use pacer::clock::ManualClock;
/// use pacer::rate_limit::{FixedWindowLimiter, RateLimitConfig};
///
/// let clock = ManualClock::new(0);
/// let limiter = FixedWindowLimiter::new(RateLimitConfig::from_millis(60_000, 2).unwrap())
///     .with_clock(clock.clone());
///
/// assert_eq!(limiter.check("10.0.0.1").remaining, 1);
/// assert_eq!(limiter.check("10.0.0.1").remaining, 0);
/// assert!(!limiter.check("10.0.0.1").allowed);
///
/// clock.advance(60_001);
/// assert!(limiter.check("10.0.0.1").allowed);
/// ```
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: LatestSlot<RateLimitConfig>,
    counters: Mutex<HashMap<String, WindowCounter>>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: LatestSlot::new(config),
            counters: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Count one request for `key` at the current clock time.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, self.clock.now_millis())
    }

    /// Count one request for `key` at `now` (milliseconds since the Unix epoch).
    pub fn check_at(&self, key: &str, now: u64) -> RateLimitDecision {
        let config = self.config.load();
        let limit = config.max_requests;
        let window = config.window_millis();
        let mut counters = self.lock();

        let before = counters.len();
        counters.retain(|_, counter| counter.reset_at >= now);
        let swept = before - counters.len();
        if swept > 0 {
            tracing::trace!(swept, "rate limit: swept expired windows");
        }

        let fresh = WindowCounter { count: 1, reset_at: now.saturating_add(window) };
        let Some(counter) = counters.get_mut(key) else {
            counters.insert(key.to_owned(), fresh);
            return allowed(limit, &fresh);
        };

        if now > counter.reset_at {
            *counter = fresh;
            return allowed(limit, counter);
        }

        if counter.count >= limit {
            tracing::debug!(key, limit, reset_at = counter.reset_at, "rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at_millis: counter.reset_at,
            };
        }

        counter.count += 1;
        allowed(limit, counter)
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<RateLimitConfig> {
        self.config.load()
    }

    /// Swap the configuration. Open windows keep their reset instant; the new
    /// quota applies from the next check.
    pub fn set_config(&self, config: RateLimitConfig) {
        tracing::info!(
            window_ms = config.window_millis(),
            max_requests = config.max_requests,
            "rate limit config updated"
        );
        self.config.store(config);
    }

    /// Forget `key`'s window. Returns whether it was tracked.
    pub fn reset(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Forget every window.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of tracked keys, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Counters stay consistent even if a holder panicked: each update is a
    // single field write.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowCounter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn allowed(limit: u32, counter: &WindowCounter) -> RateLimitDecision {
    RateLimitDecision {
        allowed: true,
        limit,
        remaining: limit.saturating_sub(counter.count),
        reset_at_millis: counter.reset_at,
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(
        &self,
        key: &str,
    ) -> Result<RateLimitDecision, Box<dyn std::error::Error + Send + Sync>> {
        Ok(FixedWindowLimiter::check(self, key))
    }
}
