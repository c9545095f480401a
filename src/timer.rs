//! Single pending timer per binding.
//!
//! Arming always cancels whatever was pending, and every armed task carries a
//! generation number. A task that wakes after being superseded (abort can lose
//! the race with a task already past its sleep) sees a stale generation and
//! does nothing.

use crate::sleeper::Delay;
use tokio::task::JoinHandle;

/// Generation stamp handed to a timer task when it is armed.
pub(crate) type Generation = u64;

#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    generation: Generation,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer, then spawn `fire(generation)` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn arm<F>(&mut self, delay: Delay, fire: F)
    where
        F: FnOnce(Generation) + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            delay.await;
            fire(generation);
        }));
    }

    /// Abort the pending timer. Returns whether one was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim the firing for `generation`. Returns `false` for a superseded timer.
    pub(crate) fn take_fire(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        self.handle = None;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
