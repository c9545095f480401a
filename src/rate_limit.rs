//! Fixed-window rate limiting.
//!
//! This module provides the building blocks for rate limiting:
//! - [`FixedWindowLimiter`]: per-key counters that reset every window.
//! - [`RateLimitDecision`]: the allow/deny outcome plus `limit` / `remaining` /
//!   `reset` metadata for `X-RateLimit-*` headers.
//! - [`RateLimitLayer`]: tower middleware that asks a [`RateLimiter`] once per request.
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` derives a key from each request (see
//!   [`key`]) and rejects with [`PacerError::RateLimited`](crate::PacerError)
//!   when the limiter denies.
//! - **Logic**: `FixedWindowLimiter` keeps counters in process memory. Deployments
//!   running several worker processes get one quota per worker unless they
//!   implement [`RateLimiter`] over a shared expiring store.
//!
//! # Window boundaries
//!
//! Windows are fixed, not sliding: a client can spend its full quota at the end
//! of one window and again at the start of the next, so up to
//! `2 × max_requests` requests may land within a short span.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::time::Duration;

pub mod config;
pub mod fixed_window;
pub mod key;
pub mod middleware;

pub use config::{RateLimitConfig, DEFAULT_MESSAGE};
pub use fixed_window::FixedWindowLimiter;
pub use key::{KeyExtractor, PeerAddr, PeerAddrKey, UNKNOWN_KEY};
pub use middleware::{RateLimitLayer, RateLimitService};

/// HTTP status for a denied request.
pub const TOO_MANY_REQUESTS: u16 = 429;
pub const LIMIT_HEADER: &str = "X-RateLimit-Limit";
pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
pub const RESET_HEADER: &str = "X-RateLimit-Reset";

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests admitted per window.
    pub limit: u32,
    /// Requests still admitted in the current window.
    pub remaining: u32,
    /// When the current window ends, in milliseconds since the Unix epoch.
    pub reset_at_millis: u64,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Window end as a UTC timestamp.
    pub fn reset_time(&self) -> DateTime<Utc> {
        i64::try_from(self.reset_at_millis)
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Window end formatted as ISO-8601 with millisecond precision,
    /// e.g. `2024-05-01T12:00:00.000Z`.
    pub fn reset_header(&self) -> String {
        self.reset_time().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// How long until the window resets, measured from `now_millis`.
    pub fn retry_after(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.reset_at_millis.saturating_sub(now_millis))
    }

    /// The three `X-RateLimit-*` header pairs.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (LIMIT_HEADER, self.limit.to_string()),
            (REMAINING_HEADER, self.remaining.to_string()),
            (RESET_HEADER, self.reset_header()),
        ]
    }
}

/// Backend interface used by the middleware.
///
/// Implement this over a shared store to enforce one quota across processes.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` and decide whether it may proceed.
    async fn check(
        &self,
        key: &str,
    ) -> Result<RateLimitDecision, Box<dyn std::error::Error + Send + Sync>>;
}
