//! Ready-made limiter configurations and timing intervals for the media
//! manager's HTTP API and UI handlers.
//!
//! ## Available Presets
//!
//! - [`api_limiter`]: general REST traffic, 100 requests per 15 minutes
//! - [`auth_limiter`]: login and token endpoints, 5 attempts per 15 minutes
//! - [`search_limiter`]: metadata/indexer search proxying, 30 per minute
//! - [`SEARCH_DEBOUNCE`] / [`SCROLL_THROTTLE`]: input and scroll pacing
//!
//! ```rust
//! use pacer::presets;
//! use pacer::rate_limit::RateLimitLayer;
//!
//! let layer = RateLimitLayer::fixed_window(presets::auth_limiter());
//! assert_eq!(layer.limiter().config().max_requests(), 5);
//! ```

use crate::rate_limit::RateLimitConfig;
use std::time::Duration;

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
const ONE_MINUTE: Duration = Duration::from_secs(60);

const API_MAX_REQUESTS: u32 = 100;
const AUTH_MAX_REQUESTS: u32 = 5;
const SEARCH_MAX_REQUESTS: u32 = 30;

/// Quiet period before a search box issues its query.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Minimum spacing between scroll-driven loads.
pub const SCROLL_THROTTLE: Duration = Duration::from_millis(100);

/// General API traffic: 100 requests per 15 minutes per client.
pub fn api_limiter() -> RateLimitConfig {
    preset(FIFTEEN_MINUTES, API_MAX_REQUESTS, "Too many requests from this IP, please try again later.")
}

/// Authentication endpoints: 5 attempts per 15 minutes per client.
pub fn auth_limiter() -> RateLimitConfig {
    preset(
        FIFTEEN_MINUTES,
        AUTH_MAX_REQUESTS,
        "Too many authentication attempts, please try again later.",
    )
}

/// Search proxying to external indexers: 30 per minute per client.
pub fn search_limiter() -> RateLimitConfig {
    preset(ONE_MINUTE, SEARCH_MAX_REQUESTS, "Too many search requests, please slow down.")
}

// Values above are non-zero constants, so validation cannot fail.
fn preset(window: Duration, max_requests: u32, message: &str) -> RateLimitConfig {
    RateLimitConfig { window, max_requests, message: message.to_string() }
}
