//! Outstanding walker count with a blocking wait for zero.
//!
//! Every walker task is registered with [`CompletionTracker::add`] *before*
//! it is spawned and holds a [`TaskGuard`] for its whole body, so the matching
//! `done()` runs on every exit path, early cancellation and panics included.

use std::sync::{Condvar, Mutex, PoisonError};

/// Wait-group style counter of in-flight walker tasks.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: Mutex<usize>,
    zero: Condvar,
}

/// Decrements the tracker when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the task as finished"]
pub struct TaskGuard<'a> {
    tracker: &'a CompletionTracker,
}

impl CompletionTracker {
    /// Create a tracker with nothing outstanding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` tasks that are about to start.
    pub fn add(&self, n: usize) {
        let mut count = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *count += n;
    }

    /// Mark one task as finished.
    ///
    /// # Panics
    ///
    /// Panics if nothing is outstanding: more `done()` calls than `add()`ed
    /// tasks is a bookkeeping bug.
    pub fn done(&self) {
        let mut count = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert!(*count > 0, "CompletionTracker::done called with nothing outstanding");
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    /// Guard that calls [`done`](Self::done) when dropped.
    ///
    /// The task must already have been counted with [`add`](Self::add).
    pub fn enter(&self) -> TaskGuard<'_> {
        TaskGuard { tracker: self }
    }

    /// Current number of outstanding tasks.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the outstanding count is zero.
    pub fn wait(&self) {
        let count = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _count = self
            .zero
            .wait_while(count, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
