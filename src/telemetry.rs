//! Telemetry for the rate limiting middleware.
//!
//! [`RateLimitLayer`](crate::rate_limit::RateLimitLayer) emits one
//! [`RateLimitEvent`] per request, plus a [`RequestOutcome`] for requests that
//! reached the inner service. Events flow into any sink implementing
//! `tower::Service<PacerEvent>`; emission is best-effort and never fails a request.
//!
//! ```rust
//! use pacer::telemetry::{PacerEvent, RateLimitEvent};
//!
//! let event = PacerEvent::RateLimit(RateLimitEvent::Denied {
//!     key: "10.0.0.7".into(),
//!     limit: 5,
//!     reset_at_millis: 60_000,
//! });
//! assert_eq!(event.to_string(), "RateLimit::Denied(key=10.0.0.7, limit=5, reset_at=60000)");
//! ```

pub mod events;
pub mod sinks;

pub use events::{PacerEvent, RateLimitEvent, RequestOutcome};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
