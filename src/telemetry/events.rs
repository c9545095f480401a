use std::fmt;
use std::time::Duration;

/// Events emitted by the rate limiting middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacerEvent {
    /// Limiter verdicts
    RateLimit(RateLimitEvent),
    /// Outcome of requests that were admitted
    Request(RequestOutcome),
}

/// Limiter verdict for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitEvent {
    /// The request was admitted.
    Allowed {
        key: String,
        /// Requests left in the key's window after this one
        remaining: u32,
    },
    /// The request was rejected without reaching the inner service.
    Denied {
        key: String,
        limit: u32,
        /// When the key's window ends (ms since the Unix epoch)
        reset_at_millis: u64,
    },
    /// The limiter backend returned an error.
    Unavailable { key: String, reason: String },
}

/// Inner service outcome for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success { duration: Duration },
    Failure { duration: Duration },
}

impl fmt::Display for PacerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacerEvent::RateLimit(event) => write!(f, "RateLimit::{}", event),
            PacerEvent::Request(event) => write!(f, "Request::{}", event),
        }
    }
}

impl fmt::Display for RateLimitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitEvent::Allowed { key, remaining } => {
                write!(f, "Allowed(key={}, remaining={})", key, remaining)
            }
            RateLimitEvent::Denied { key, limit, reset_at_millis } => {
                write!(f, "Denied(key={}, limit={}, reset_at={})", key, limit, reset_at_millis)
            }
            RateLimitEvent::Unavailable { key, reason } => {
                write!(f, "Unavailable(key={}, reason={})", key, reason)
            }
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOutcome::Success { duration } => write!(f, "Success(duration={:?})", duration),
            RequestOutcome::Failure { duration } => write!(f, "Failure(duration={:?})", duration),
        }
    }
}

impl PacerEvent {
    /// Whether this event records a rejected request.
    pub fn is_denial(&self) -> bool {
        matches!(self, PacerEvent::RateLimit(RateLimitEvent::Denied { .. }))
    }
}
