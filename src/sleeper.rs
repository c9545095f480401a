//! Timer source for debounce and throttle bindings.
//!
//! Bindings never sleep inline; they hand the future returned here to a
//! spawned task. Swapping the sleeper lets tests observe requested delays
//! without waiting for them.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Boxed delay future handed to a timer task.
pub type Delay = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Produces delay futures for armed timers.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Future that resolves once `duration` has passed.
    fn sleep(&self, duration: Duration) -> Delay;
}

/// Sleeper backed by `tokio::time::sleep`; honours paused test time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Delay {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Resolves immediately. Timers still fire on a later task poll, never inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Delay {
        Box::pin(async {})
    }
}

/// Records each requested delay, then resolves immediately.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, oldest first.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent delay requested.
    pub fn last(&self) -> Option<Duration> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).last().copied()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Delay {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(duration);
        Box::pin(async {})
    }
}
