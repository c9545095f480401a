use crate::error::ConfigError;
use std::time::Duration;

/// Body text returned with a denial when none is configured.
pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

/// Validated fixed-window limiter configuration.
///
/// With feature `serde` this (de)serializes from the camelCase shape
/// `{ "windowMs": 60000, "maxRequests": 100, "message": "..." }`; deserializing
/// runs the same validation as [`RateLimitConfig::new`].
///
/// # Examples
/// ```
/// use pacer::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::new(Duration::from_secs(60), 100)
///     .unwrap()
///     .with_message("Slow down");
/// assert_eq!(config.max_requests(), 100);
/// assert!(RateLimitConfig::new(Duration::ZERO, 100).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawConfig", into = "RawConfig")
)]
pub struct RateLimitConfig {
    pub(crate) window: Duration,
    pub(crate) max_requests: u32,
    pub(crate) message: String,
}

impl RateLimitConfig {
    /// Errors if `window` is under a millisecond (or overflows a millisecond
    /// timestamp) or `max_requests` is zero.
    pub fn new(window: Duration, max_requests: u32) -> Result<Self, ConfigError> {
        if window.as_millis() == 0 {
            return Err(ConfigError::ZeroWindow(window));
        }
        if u64::try_from(window.as_millis()).is_err() {
            return Err(ConfigError::WindowTooLarge(window));
        }
        if max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        Ok(Self { window, max_requests, message: DEFAULT_MESSAGE.to_string() })
    }

    /// Convenience constructor taking the window in milliseconds.
    pub fn from_millis(window_ms: u64, max_requests: u32) -> Result<Self, ConfigError> {
        Self::new(Duration::from_millis(window_ms), max_requests)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in milliseconds; always fits thanks to validation.
    pub fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "serde")]
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    window_ms: u64,
    max_requests: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawConfig> for RateLimitConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let config = Self::from_millis(raw.window_ms, raw.max_requests)?;
        Ok(match raw.message {
            Some(message) => config.with_message(message),
            None => config,
        })
    }
}

#[cfg(feature = "serde")]
impl From<RateLimitConfig> for RawConfig {
    fn from(config: RateLimitConfig) -> Self {
        Self {
            window_ms: config.window_millis(),
            max_requests: config.max_requests,
            message: Some(config.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_window() {
        let err = RateLimitConfig::new(Duration::ZERO, 5).expect_err("zero window is invalid");
        assert_eq!(err, ConfigError::ZeroWindow(Duration::ZERO));

        let err = RateLimitConfig::new(Duration::from_micros(999), 5)
            .expect_err("sub-millisecond window is invalid");
        assert!(matches!(err, ConfigError::ZeroWindow(_)));
    }

    #[test]
    fn rejects_zero_max_requests() {
        let err = RateLimitConfig::from_millis(60_000, 0).expect_err("zero quota is invalid");
        assert_eq!(err, ConfigError::ZeroMaxRequests);
    }

    #[test]
    fn rejects_unrepresentable_window() {
        let err = RateLimitConfig::new(Duration::MAX, 1).expect_err("window overflows u64 millis");
        assert!(matches!(err, ConfigError::WindowTooLarge(_)));
    }

    #[test]
    fn defaults_message() {
        let config = RateLimitConfig::from_millis(60_000, 5).unwrap();
        assert_eq!(config.message(), DEFAULT_MESSAGE);
        assert_eq!(config.window_millis(), 60_000);
        assert_eq!(config.with_message("nope").message(), "nope");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_camel_case_and_validates() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"windowMs": 900000, "maxRequests": 100}"#).unwrap();
        assert_eq!(config.window(), Duration::from_secs(900));
        assert_eq!(config.max_requests(), 100);
        assert_eq!(config.message(), DEFAULT_MESSAGE);

        let err = serde_json::from_str::<RateLimitConfig>(r#"{"windowMs": 0, "maxRequests": 1}"#)
            .expect_err("validation runs on deserialize");
        assert!(err.to_string().contains("window"));
    }
}
