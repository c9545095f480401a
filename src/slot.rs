//! Single-value holder whose contents can be swapped while readers hold
//! snapshots.
//!
//! Timers read through a [`LatestSlot`] at fire time, so a callback or limit
//! replaced after a timer was armed is still the one that runs. The default
//! backend is `ArcSwap`; feature `adaptive-rwlock` switches to `RwLock`.

use std::sync::Arc;

#[cfg(feature = "adaptive-rwlock")]
use std::sync::{PoisonError, RwLock};

#[cfg(not(feature = "adaptive-rwlock"))]
use arc_swap::ArcSwap;

/// Shared slot holding the most recently stored value.
///
/// Clones point at the same slot.
#[derive(Debug)]
pub struct LatestSlot<T> {
    #[cfg(not(feature = "adaptive-rwlock"))]
    inner: Arc<ArcSwap<T>>,
    #[cfg(feature = "adaptive-rwlock")]
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> LatestSlot<T> {
    /// Create a slot holding `value`.
    pub fn new(value: T) -> Self {
        #[cfg(not(feature = "adaptive-rwlock"))]
        {
            Self { inner: Arc::new(ArcSwap::from_pointee(value)) }
        }
        #[cfg(feature = "adaptive-rwlock")]
        {
            Self { inner: Arc::new(RwLock::new(Arc::new(value))) }
        }
    }

    /// Snapshot the current value.
    pub fn load(&self) -> Arc<T> {
        #[cfg(not(feature = "adaptive-rwlock"))]
        {
            self.inner.load_full()
        }
        #[cfg(feature = "adaptive-rwlock")]
        {
            self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    /// Replace the value; existing snapshots keep the old one.
    pub fn store(&self, value: T) {
        #[cfg(not(feature = "adaptive-rwlock"))]
        {
            self.inner.store(Arc::new(value));
        }
        #[cfg(feature = "adaptive-rwlock")]
        {
            *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(value);
        }
    }

    /// Derive a new value from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.load());
        self.store(next);
    }
}
