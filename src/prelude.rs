//! Convenient re-exports for common pacer types.
pub use crate::{
    debounce::{DebouncedFn, DebouncedValue},
    error::{ConfigError, PacerError},
    rate_limit::{
        FixedWindowLimiter, KeyExtractor, PeerAddr, RateLimitConfig, RateLimitDecision,
        RateLimitLayer, RateLimiter,
    },
    throttle::{ThrottledFn, ThrottledValue},
};
