#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # pacer
//!
//! Pacing primitives for async Rust: debounce, throttle, and fixed-window rate
//! limiting with a tower middleware layer.
//!
//! ## Features
//!
//! - **Debounce** values ([`DebouncedValue`]) and callbacks ([`DebouncedFn`]):
//!   emit only after input has been quiet for a delay
//! - **Throttle** values ([`ThrottledValue`]) and callbacks ([`ThrottledFn`]):
//!   at most one emission per interval
//! - **Fixed-window rate limiting** per caller key ([`FixedWindowLimiter`]) with
//!   `X-RateLimit-*` metadata
//! - **Tower middleware** ([`RateLimitLayer`]) with pluggable key extraction and telemetry
//!
//! ## Quick Start
//!
//! ```rust
//! use pacer::{FixedWindowLimiter, RateLimitConfig};
//!
//! let limiter = FixedWindowLimiter::new(RateLimitConfig::from_millis(60_000, 5).unwrap());
//! for expected in [4, 3, 2, 1, 0] {
//!     let decision = limiter.check("203.0.113.9");
//!     assert!(decision.allowed);
//!     assert_eq!(decision.remaining, expected);
//! }
//! assert!(!limiter.check("203.0.113.9").allowed);
//! ```
//!
//! Debounce and throttle bindings spawn their timers on the ambient tokio
//! runtime and never block the caller.

pub mod clock;
pub mod debounce;
pub mod error;
pub mod prelude;
pub mod presets;
pub mod rate_limit;
pub mod sleeper;
pub mod slot;
pub mod telemetry;
pub mod throttle;
mod timer;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{Callback, DebouncedFn, DebouncedValue};
pub use error::{ConfigError, PacerError};
pub use rate_limit::{
    FixedWindowLimiter, RateLimitConfig, RateLimitDecision, RateLimitLayer, RateLimiter,
};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use slot::LatestSlot;
pub use throttle::{ThrottledFn, ThrottledValue};
