//! Lazily acquired services.
//!
//! Some export steps depend on a service that is expensive to set up (a
//! document converter, for instance). A [`CapabilityCell`] loads it at most
//! once at a time and caches the result:
//!
//! ```text
//! Unloaded ──► Loading ──► Ready
//!                 │
//!                 └──────► Failed ──► Loading (next call retries)
//! ```
//!
//! Callers that arrive while a load is in flight block until it finishes
//! and share its outcome.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

/// Observable lifecycle state of a [`CapabilityCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

enum Slot<T> {
    Unloaded,
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

struct Inner<T> {
    slot: Slot<T>,
    /// Bumped whenever a load finishes.
    loads: u64,
}

/// A lazily loaded, shareable value.
pub struct CapabilityCell<T> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
    finished: Condvar,
}

impl<T> CapabilityCell<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                slot: Slot::Unloaded,
                loads: 0,
            }),
            finished: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> CapabilityState {
        match self.lock().slot {
            Slot::Unloaded => CapabilityState::Unloaded,
            Slot::Loading => CapabilityState::Loading,
            Slot::Ready(_) => CapabilityState::Ready,
            Slot::Failed(_) => CapabilityState::Failed,
        }
    }

    /// The loaded value, if any, without triggering a load.
    pub fn get(&self) -> Option<Arc<T>> {
        match &self.lock().slot {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the value, loading it first if needed.
    ///
    /// Only one caller runs `loader`; concurrent callers wait for it and
    /// receive the same value or the same failure. A failed load is retried
    /// by the next call that finds the cell `Failed`. A ready value is never
    /// replaced.
    pub fn ensure_ready<F>(&self, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut inner = self.lock();
        let mut waited_for = None;

        loop {
            let in_flight = match &inner.slot {
                Slot::Ready(value) => return Ok(Arc::clone(value)),
                // The load we waited on failed: share its outcome
                Slot::Failed(reason) if waited_for.is_some_and(|loads| loads != inner.loads) => {
                    return Err(self.unavailable(reason.clone()));
                }
                Slot::Loading => true,
                Slot::Unloaded | Slot::Failed(_) => false,
            };
            if !in_flight {
                break;
            }
            waited_for = Some(inner.loads);
            inner = self.finished.wait(inner).unwrap_or_else(PoisonError::into_inner);
        }

        inner.slot = Slot::Loading;
        drop(inner);
        tracing::debug!(capability = self.name, "loading");

        let mut guard = LoadGuard { cell: self, done: false };
        let outcome = loader();
        guard.done = true;

        let mut inner = self.lock();
        inner.loads += 1;
        let result = match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                inner.slot = Slot::Ready(Arc::clone(&value));
                tracing::debug!(capability = self.name, "ready");
                Ok(value)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(capability = self.name, error = %reason, "failed to load");
                inner.slot = Slot::Failed(reason.clone());
                Err(self.unavailable(reason))
            }
        };
        drop(inner);
        self.finished.notify_all();
        result
    }

    fn unavailable(&self, reason: String) -> Error {
        Error::CapabilityUnavailable {
            capability: self.name,
            reason,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the cell failed if the loader unwinds, so waiters are released.
struct LoadGuard<'a, T> {
    cell: &'a CapabilityCell<T>,
    done: bool,
}

impl<T> Drop for LoadGuard<'_, T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut inner = self.cell.lock();
        inner.loads += 1;
        inner.slot = Slot::Failed("loader panicked".to_string());
        drop(inner);
        self.cell.finished.notify_all();
    }
}
