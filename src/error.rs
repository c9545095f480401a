//! Error types.
//!
//! Debounce and throttle operations cannot fail, and a rate limit denial from
//! [`FixedWindowLimiter::check`](crate::rate_limit::FixedWindowLimiter::check)
//! is an ordinary value. Errors appear in two places only: rejecting an invalid
//! configuration, and the middleware surfacing a denial to the service caller.
use crate::rate_limit::{RateLimitDecision, TOO_MANY_REQUESTS};
use std::fmt;
use std::time::Duration;

/// Invalid rate limiter configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The window must span at least one millisecond.
    #[error("window must be at least 1ms (got {0:?})")]
    ZeroWindow(Duration),
    /// The window does not fit in a millisecond timestamp.
    #[error("window of {0:?} is too large")]
    WindowTooLarge(Duration),
    /// At least one request per window must be admitted.
    #[error("max_requests must be > 0")]
    ZeroMaxRequests,
}

/// Error returned by services wrapped in a
/// [`RateLimitLayer`](crate::rate_limit::RateLimitLayer).
#[derive(Debug, Clone)]
pub enum PacerError<E> {
    /// The caller exceeded its quota for the current window.
    RateLimited { message: String, decision: RateLimitDecision },
    /// The limiter backend failed (e.g. a shared store is unreachable).
    Infrastructure(String),
    /// The wrapped service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for PacerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { message, decision } => {
                write!(f, "{} (limit {}, resets at {})", message, decision.limit, decision.reset_header())
            }
            Self::Infrastructure(reason) => write!(f, "rate limiter unavailable: {}", reason),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for PacerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> PacerError<E> {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }

    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// The denial metadata, for building `X-RateLimit-*` headers.
    pub fn decision(&self) -> Option<&RateLimitDecision> {
        match self {
            Self::RateLimited { decision, .. } => Some(decision),
            _ => None,
        }
    }

    /// Body text configured for denials.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::RateLimited { message, .. } => Some(message),
            _ => None,
        }
    }

    /// HTTP status the collaborator should answer with, when this crate decides it.
    pub fn status_code(&self) -> Option<u16> {
        self.is_rate_limited().then_some(TOO_MANY_REQUESTS)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
