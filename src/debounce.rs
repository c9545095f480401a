//! Debounced values and callbacks.
//!
//! A debounced binding releases its input only after the input has stopped
//! changing for the configured delay. Every change re-arms the binding's single
//! timer, so a burst of changes produces exactly one emission carrying the last
//! value of the burst.
//!
//! ```rust
//! use pacer::DebouncedValue;
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() {
//!     let query = DebouncedValue::new(String::new(), Duration::from_millis(300));
//!     let mut updates = query.subscribe();
//!
//!     query.set("st".to_string());
//!     query.set("star".to_string());
//!     query.set("star trek".to_string());
//!
//!     updates.changed().await.unwrap();
//!     assert_eq!(query.get(), "star trek");
//! }
//! ```

use crate::sleeper::{Sleeper, TokioSleeper};
use crate::slot::LatestSlot;
use crate::timer::{Generation, TimerSlot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

struct ValueState<T> {
    pending: Option<T>,
    timer: TimerSlot,
}

struct ValueInner<T> {
    state: Mutex<ValueState<T>>,
    output: watch::Sender<T>,
    delay: Duration,
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
        if let Some(value) = state.pending.take() {
            self.output.send_replace(value);
            tracing::trace!(delay = ?self.delay, "debounce: emitted");
        }
    }
}

/// A value whose observable output trails its input by a quiet period.
///
/// Dropping the binding cancels any pending emission.
pub struct DebouncedValue<T> {
    inner: Arc<ValueInner<T>>,
}

impl<T> DebouncedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a binding whose output starts at `initial`.
    pub fn new(initial: T, delay: Duration) -> Self {
        Self::with_parts(initial, delay, Arc::new(TokioSleeper))
    }

    /// Override the timer source (useful for deterministic tests).
    ///
    /// Any pending input is dropped; the current output carries over.
    pub fn with_sleeper<S: Sleeper + 'static>(self, sleeper: S) -> Self {
        Self::with_parts(self.get(), self.inner.delay, Arc::new(sleeper))
    }

    fn with_parts(initial: T, delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        let (output, _) = watch::channel(initial);
        Self {
            inner: Arc::new(ValueInner {
                state: Mutex::new(ValueState { pending: None, timer: TimerSlot::new() }),
                output,
                delay,
                sleeper,
            }),
        }
    }

    /// Feed a new input value and restart the quiet period.
    ///
    /// Never emits synchronously, even with a zero delay. Must be called from
    /// within a tokio runtime.
    pub fn set(&self, value: T) {
        let mut state = self.inner.lock();
        state.pending = Some(value);
        let inner = Arc::clone(&self.inner);
        let restarted = state.timer.is_pending();
        state.timer.arm(self.inner.sleeper.sleep(self.inner.delay), move |generation| {
            inner.fire(generation)
        });
        tracing::trace!(delay = ?self.inner.delay, restarted, "debounce: armed");
    }

    /// Last emitted value.
    pub fn get(&self) -> T {
        self.inner.output.borrow().clone()
    }

    /// Receiver notified on every emission.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.output.subscribe()
    }

    /// Emit the pending input right away. Returns `false` when nothing was pending.
    pub fn flush(&self) -> bool {
        let mut state = self.inner.lock();
        state.timer.cancel();
        match state.pending.take() {
            Some(value) => {
                self.inner.output.send_replace(value);
                tracing::trace!("debounce: flushed");
                true
            }
            None => false,
        }
    }

    /// Drop the pending input without emitting it. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.pending = None;
        state.timer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_pending()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

impl<T> Drop for DebouncedValue<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = None;
        state.timer.cancel();
    }
}

impl<T> std::fmt::Debug for DebouncedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedValue").field("delay", &self.inner.delay).finish_non_exhaustive()
    }
}

/// Callback stored in a debounced or throttled binding.
pub type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct FnState<A> {
    args: Option<A>,
    timer: TimerSlot,
}

struct FnInner<A> {
    state: Mutex<FnState<A>>,
    callback: LatestSlot<Callback<A>>,
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<A> FnInner<A>
where
    A: Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, FnState<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: Generation) {
        let args = {
            let mut state = self.lock();
            if !state.timer.take_fire(generation) {
                return;
            }
            state.args.take()
        };
        // Invoked outside the lock so the callback may call back into the binding.
        if let Some(args) = args {
            self.invoke(args);
        }
    }

    fn invoke(&self, args: A) {
        let callback = self.callback.load();
        (**callback)(args);
        tracing::trace!(delay = ?self.delay, "debounce: invoked callback");
    }
}

/// A callback whose invocations collapse into one after a quiet period.
///
/// The last call's arguments win. The callback can be replaced at any time and
/// the replacement is what a pending timer invokes.
pub struct DebouncedFn<A> {
    inner: Arc<FnInner<A>>,
}

impl<A> DebouncedFn<A>
where
    A: Send + 'static,
{
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_parts(delay, Arc::new(callback), Arc::new(TokioSleeper))
    }

    /// Override the timer source. Any pending call is dropped.
    pub fn with_sleeper<S: Sleeper + 'static>(self, sleeper: S) -> Self {
        Self::with_parts(self.inner.delay, (*self.inner.callback.load()).clone(), Arc::new(sleeper))
    }

    fn with_parts(delay: Duration, callback: Callback<A>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner: Arc::new(FnInner {
                state: Mutex::new(FnState { args: None, timer: TimerSlot::new() }),
                callback: LatestSlot::new(callback),
                delay,
                sleeper,
            }),
        }
    }

    /// Schedule the callback with `args`, superseding any pending call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, args: A) {
        let mut state = self.inner.lock();
        state.args = Some(args);
        let inner = Arc::clone(&self.inner);
        state.timer.arm(self.inner.sleeper.sleep(self.inner.delay), move |generation| {
            inner.fire(generation)
        });
    }

    /// Swap the callback. A pending call keeps its schedule and runs the new callback.
    pub fn replace<F>(&self, callback: F)
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.inner.callback.store(Arc::new(callback));
    }

    /// Run the pending call now. Returns `false` when nothing was pending.
    pub fn flush(&self) -> bool {
        let args = {
            let mut state = self.inner.lock();
            state.timer.cancel();
            state.args.take()
        };
        match args {
            Some(args) => {
                self.inner.invoke(args);
                true
            }
            None => false,
        }
    }

    /// Drop the pending call. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.args = None;
        state.timer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_pending()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

impl<A> Drop for DebouncedFn<A> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.args = None;
        state.timer.cancel();
    }
}

impl<A> std::fmt::Debug for DebouncedFn<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedFn").field("delay", &self.inner.delay).finish_non_exhaustive()
    }
}
