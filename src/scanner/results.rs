//! Results channel between walkers and the aggregator.
//!
//! Sizes travel as `Some(size)`; end-of-stream is a single `None` pushed by
//! the [`ResultsCloser`]. The closer is move-only and not `Clone`, so the
//! stream can be closed exactly once, and walkers only ever see a
//! [`SizeSender`] that cannot produce the sentinel.

use crossbeam_channel::{bounded, Receiver, Sender};

/// Create a results channel with the given capacity (0 = rendezvous).
#[must_use]
pub fn channel(capacity: usize) -> (SizeSender, ResultsCloser, ResultsReceiver) {
    let (tx, rx) = bounded(capacity);
    (
        SizeSender { tx: tx.clone() },
        ResultsCloser { tx },
        ResultsReceiver { rx },
    )
}

/// Cloneable handle used by walkers to emit file sizes.
#[derive(Debug, Clone)]
pub struct SizeSender {
    tx: Sender<Option<u64>>,
}

impl SizeSender {
    /// Send one file size, blocking while the channel is full.
    ///
    /// Returns `false` if the receiver is gone, which only happens when the
    /// aggregator has already returned.
    pub fn send(&self, size: u64) -> bool {
        self.tx.send(Some(size)).is_ok()
    }
}

/// Single-use handle that ends the stream.
#[derive(Debug)]
pub struct ResultsCloser {
    tx: Sender<Option<u64>>,
}

impl ResultsCloser {
    /// Push the end-of-stream marker. Consumes the closer.
    pub fn close(self) {
        if self.tx.send(None).is_err() {
            log::debug!("Results receiver dropped before the stream was closed");
        }
    }
}

/// Aggregator side of the channel.
#[derive(Debug)]
pub struct ResultsReceiver {
    rx: Receiver<Option<u64>>,
}

impl ResultsReceiver {
    /// Underlying receiver, for use in `select!`.
    #[must_use]
    pub fn as_receiver(&self) -> &Receiver<Option<u64>> {
        &self.rx
    }
}
