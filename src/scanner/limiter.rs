//! Bounded counting semaphore for directory listings.
//!
//! The limiter caps how many directory handles are open at the same time. It
//! does not bound CPU parallelism: walker tasks that do not hold a permit are
//! free to run (and to block on sending results).
//!
//! Permits are slots in a bounded [`crossbeam_channel`]: acquiring pushes a
//! token into the channel (blocking while it is full) and releasing pops one.
//! Because the acquire is a channel operation it can take part in a
//! `select!` against the cancellation signal, so a waiter never misses a
//! cancellation while parked on a full limiter.
//!
//! # Example
//!
//! ```
//! use rustdu::scanner::ConcurrencyLimiter;
//! use rustdu::signal::CancelToken;
//!
//! let limiter = ConcurrencyLimiter::new(2);
//! let cancel = CancelToken::new();
//!
//! let permit = limiter.acquire(&cancel).expect("not cancelled");
//! assert_eq!(limiter.in_use(), 1);
//! drop(permit);
//! assert_eq!(limiter.in_use(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::signal::CancelToken;

/// Default number of simultaneous directory listings.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// A counting semaphore with a fixed capacity.
///
/// The instrumented `in_use` and `peak` counters exist so callers (and tests)
/// can observe the bound; they are updated strictly inside the window in which
/// a slot is held, so `in_use() <= capacity()` at every instant.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    capacity: usize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// A held permit. Dropping it returns the slot to the limiter.
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` permits.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-permit limiter would block every
    /// listing forever. [`crate::scanner::Scanner`] validates this before
    /// constructing a limiter.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "limiter capacity must be at least 1");
        let (slots_tx, slots_rx) = bounded(capacity);
        Self {
            slots_tx,
            slots_rx,
            capacity,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Wait for a permit, giving up if `cancel` fires first.
    ///
    /// Cancellation is checked before waiting, and then raced against the
    /// acquisition itself. Returns `None` (holding nothing) when cancelled.
    pub fn acquire(&self, cancel: &CancelToken) -> Option<Permit<'_>> {
        if cancel.is_fired() {
            return None;
        }

        select! {
            send(self.slots_tx, ()) -> res => {
                // We own both ends of the channel, so it can never disconnect.
                res.ok()?;
            }
            recv(cancel.wait_case()) -> _ => return None,
        }

        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Some(Permit { limiter: self })
    }

    /// Take a permit only if one is free right now.
    #[cfg(test)]
    fn try_acquire(&self) -> Option<Permit<'_>> {
        self.slots_tx.try_send(()).ok()?;
        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Some(Permit { limiter: self })
    }

    /// Return a slot. Only reachable through [`Permit`]'s `Drop`.
    fn release(&self) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        let released = self.slots_rx.try_recv();
        debug_assert!(released.is_ok(), "released a permit that was never acquired");
    }

    /// Fixed number of permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
