//! Single consumer of walker results.
//!
//! The [`Aggregator`] multiplexes three sources with `crossbeam_channel::select!`:
//! the results channel, a progress ticker (a `never()` receiver when progress
//! is off, so that arm can never be chosen), and the cancellation signal.
//!
//! ```text
//!            size / tick                     size (discarded)
//!           ┌──────────┐                    ┌──────────┐
//!           ▼          │      cancel        ▼          │
//!        Running ──────┴──────────────▶ Draining ──────┘
//!           │                               │
//!           │ end of stream                 │ end of stream
//!           ▼                               ▼
//!        Completed ◀────────────────────────┘
//! ```
//!
//! Draining keeps receiving after cancellation until the closer has pushed the
//! end-of-stream marker. Stopping at the cancel instead would leave any walker
//! that is mid-send on a full (or rendezvous) channel blocked forever.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{never, select, tick, Receiver};
use serde::Serialize;

use super::results::ResultsReceiver;
use crate::progress::ProgressCallback;
use crate::signal::CancelToken;

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Number of non-directory entries seen
    pub nfiles: u64,
    /// Sum of their sizes in bytes
    pub nbytes: u64,
}

impl AggregateStats {
    /// Account for one file.
    pub fn record(&mut self, size: u64) {
        self.nfiles += 1;
        self.nbytes += size;
    }

    /// Total size in decimal megabytes.
    #[must_use]
    pub fn megabytes(&self) -> f64 {
        self.nbytes as f64 / 1e6
    }
}

impl fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} files {:.1} MB", self.nfiles, self.megabytes())
    }
}

/// Aggregator loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Accumulating sizes and reporting progress.
    Running,
    /// Cancelled; discarding sizes until the stream ends.
    Draining,
    /// Terminal.
    Completed,
}

/// What the aggregator saw by the time it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorOutcome {
    /// Totals accumulated while running
    pub stats: AggregateStats,
    /// Whether cancellation had fired by the time the stream ended
    pub cancelled: bool,
    /// Sizes received and thrown away while draining
    pub discarded: u64,
}

/// Consumer loop over the results channel.
pub struct Aggregator {
    results: ResultsReceiver,
    cancel: CancelToken,
    ticker: Receiver<std::time::Instant>,
    progress: Option<Arc<dyn ProgressCallback>>,
    stats: AggregateStats,
    state: AggregatorState,
    cancelled: bool,
    discarded: u64,
}

impl Aggregator {
    /// Create an aggregator with progress reporting disabled.
    #[must_use]
    pub fn new(results: ResultsReceiver, cancel: CancelToken) -> Self {
        Self {
            results,
            cancel,
            ticker: never(),
            progress: None,
            stats: AggregateStats::default(),
            state: AggregatorState::Running,
            cancelled: false,
            discarded: 0,
        }
    }

    /// Report to `progress` on every tick of `interval`, and at the end.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>, interval: Duration) -> Self {
        self.ticker = tick(interval);
        self.progress = Some(progress);
        self
    }

    /// Report to `progress` at the end only (no periodic ticks).
    #[must_use]
    pub fn with_final_report(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    #[cfg(test)]
    fn state(&self) -> AggregatorState {
        self.state
    }

    /// Run until the results stream ends.
    pub fn run(mut self) -> AggregatorOutcome {
        loop {
            self.state = match self.state {
                AggregatorState::Running => self.step_running(),
                AggregatorState::Draining => self.drain(),
                AggregatorState::Completed => break,
            };
        }

        if let Some(progress) = &self.progress {
            progress.on_scan_end(&self.stats, self.cancelled);
        }
        AggregatorOutcome {
            stats: self.stats,
            cancelled: self.cancelled,
            discarded: self.discarded,
        }
    }

    fn step_running(&mut self) -> AggregatorState {
        select! {
            recv(self.results.as_receiver()) -> msg => match msg {
                Ok(Some(size)) => {
                    self.stats.record(size);
                    AggregatorState::Running
                }
                // End-of-stream marker, or every sender dropped. A cancel
                // that raced the marker still counts; one after it does not.
                Ok(None) | Err(_) => {
                    self.cancelled = self.cancel.is_fired();
                    AggregatorState::Completed
                }
            },
            recv(self.ticker) -> _ => {
                if let Some(progress) = &self.progress {
                    progress.on_tick(&self.stats);
                }
                AggregatorState::Running
            }
            recv(self.cancel.wait_case()) -> _ => {
                log::info!("Scan cancelled, draining pending results");
                self.cancelled = true;
                if let Some(progress) = &self.progress {
                    progress.on_cancel();
                }
                AggregatorState::Draining
            }
        }
    }

    fn drain(&mut self) -> AggregatorState {
        for msg in self.results.as_receiver().iter() {
            match msg {
                Some(_) => self.discarded += 1,
                None => break,
            }
        }
        log::debug!("Drained {} results after cancellation", self.discarded);
        AggregatorState::Completed
    }
}
