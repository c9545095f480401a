//! Throttled values and callbacks.
//!
//! - [`ThrottledValue`] releases its input at most once per interval and
//!   always catches up with the latest input: a change inside the cooldown is
//!   deferred to the end of the cooldown and emits whatever is current then.
//! - [`ThrottledFn`] is a strict leading-edge throttle: calls inside the
//!   cooldown are dropped, never replayed.
//!
//! Time is read from `tokio::time::Instant`, so paused test clocks apply.

use crate::debounce::Callback;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::slot::LatestSlot;
use crate::timer::{Generation, TimerSlot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

struct ValueState<T> {
    latest: Option<T>,
    last_emit: Instant,
    timer: TimerSlot,
}

struct ValueInner<T> {
    state: Mutex<ValueState<T>>,
    output: watch::Sender<T>,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<T> ValueInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, ValueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: Generation) {
        let mut state = self.lock();
        if !state.timer.take_fire(generation) {
            return;
        }
        if let Some(value) = state.latest.take() {
            state.last_emit = Instant::now();
            self.output.send_replace(value);
            tracing::trace!(interval = ?self.interval, "throttle: trailing emit");
        }
    }
}

/// A value whose output updates at most once per interval.
///
/// The binding's creation counts as an emission, so a change made within the
/// first interval is deferred. Dropping the binding cancels a deferred emission.
pub struct ThrottledValue<T> {
    inner: Arc<ValueInner<T>>,
}

impl<T> ThrottledValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, interval: Duration) -> Self {
        Self::with_parts(initial, interval, Arc::new(TokioSleeper))
    }

    /// Override the timer source. Any deferred input is dropped.
    pub fn with_sleeper<S: Sleeper + 'static>(self, sleeper: S) -> Self {
        Self::with_parts(self.get(), self.inner.interval, Arc::new(sleeper))
    }

    fn with_parts(initial: T, interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        let (output, _) = watch::channel(initial);
        Self {
            inner: Arc::new(ValueInner {
                state: Mutex::new(ValueState {
                    latest: None,
                    last_emit: Instant::now(),
                    timer: TimerSlot::new(),
                }),
                output,
                interval,
                sleeper,
            }),
        }
    }

    /// Feed a new input value.
    ///
    /// Emits immediately when the cooldown has passed; otherwise the value is
    /// held and a single trailing emission is scheduled for the end of the
    /// cooldown. Must be called from within a tokio runtime.
    pub fn set(&self, value: T) {
        let mut state = self.inner.lock();
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_emit);

        if elapsed >= self.inner.interval {
            state.timer.cancel();
            state.latest = None;
            state.last_emit = now;
            self.inner.output.send_replace(value);
            tracing::trace!(interval = ?self.inner.interval, "throttle: leading emit");
            return;
        }

        state.latest = Some(value);
        if !state.timer.is_pending() {
            let remaining = self.inner.interval - elapsed;
            let inner = Arc::clone(&self.inner);
            state.timer.arm(self.inner.sleeper.sleep(remaining), move |generation| {
                inner.fire(generation)
            });
            tracing::trace!(?remaining, "throttle: deferred");
        }
    }

    /// Last emitted value.
    pub fn get(&self) -> T {
        self.inner.output.borrow().clone()
    }

    /// Receiver notified on every emission.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.output.subscribe()
    }

    /// Drop a deferred input. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.latest = None;
        state.timer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_pending()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl<T> Drop for ThrottledValue<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.latest = None;
        state.timer.cancel();
    }
}

impl<T> std::fmt::Debug for ThrottledValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledValue").field("interval", &self.inner.interval).finish_non_exhaustive()
    }
}

/// Leading-edge throttled callback.
///
/// ```rust
/// use pacer::ThrottledFn;
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let on_scroll = ThrottledFn::new(Duration::from_millis(100), |offset: u32| {
///         println!("load rows near {offset}");
///     });
///     assert!(on_scroll.call(0));
///     assert!(!on_scroll.call(10)); // dropped, not replayed
/// }
/// ```
pub struct ThrottledFn<A> {
    callback: LatestSlot<Callback<A>>,
    last_exec: Mutex<Option<Instant>>,
    interval: Duration,
}

impl<A> ThrottledFn<A> {
    pub fn new<F>(interval: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            callback: LatestSlot::new(Arc::new(callback)),
            last_exec: Mutex::new(None),
            interval,
        }
    }

    /// Run the callback if the cooldown has passed. Returns whether it ran.
    pub fn call(&self, args: A) -> bool {
        {
            let mut last_exec = self.last_exec.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            if let Some(last) = *last_exec {
                if now.saturating_duration_since(last) < self.interval {
                    tracing::trace!(interval = ?self.interval, "throttle: dropped call");
                    return false;
                }
            }
            *last_exec = Some(now);
        }
        let callback = self.callback.load();
        (**callback)(args);
        true
    }

    /// Swap the callback; the cooldown is unaffected.
    pub fn replace<F>(&self, callback: F)
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.callback.store(Arc::new(callback));
    }

    /// Forget the last execution so the next call runs immediately.
    pub fn reset(&self) {
        *self.last_exec.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<A> std::fmt::Debug for ThrottledFn<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledFn").field("interval", &self.interval).finish_non_exhaustive()
    }
}
