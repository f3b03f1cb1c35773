//! Scan orchestration.
//!
//! [`Scanner::run`] wires the pieces together for one scan:
//!
//! - a dedicated rayon pool runs the walker tasks
//! - every root is counted in the [`CompletionTracker`] *before* the closer
//!   thread starts, so the count can only reach zero once all work is done
//! - a named closer thread waits for zero and ends the results stream
//! - the [`Aggregator`] runs on the calling thread
//!
//! The call returns only after the aggregator has seen end-of-stream, which
//! in turn implies every walker has returned: no walker task outlives `run`.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::aggregator::{AggregateStats, Aggregator};
use super::limiter::{ConcurrencyLimiter, DEFAULT_CONCURRENCY};
use super::lister::{DirLister, FsLister};
use super::results;
use super::tracker::CompletionTracker;
use super::walker::{walk_dir, WalkContext, WalkCounters};
use super::ScanError;
use crate::progress::{LogProgress, ProgressCallback};
use crate::signal::CancelToken;

/// Default period of progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Tunables for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Maximum simultaneous directory listings
    pub concurrency: usize,
    /// Walker pool size; `None` lets rayon pick (one per CPU)
    pub workers: Option<usize>,
    /// Capacity of the results channel; 0 makes every send a rendezvous
    pub results_capacity: usize,
    /// Tick period for progress reports; `None` disables ticking
    pub progress_interval: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            workers: None,
            results_capacity: 0,
            progress_interval: None,
        }
    }
}

impl ScanConfig {
    /// Set the listing concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the walker pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Set the results channel capacity.
    #[must_use]
    pub fn with_results_capacity(mut self, capacity: usize) -> Self {
        self.results_capacity = capacity;
        self
    }

    /// Enable (or disable with `None`) periodic progress reports.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Option<Duration>) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidConcurrency`] for a zero limit and
    /// [`ScanError::InvalidWorkers`] for a zero-thread pool.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConcurrency);
        }
        if self.workers == Some(0) {
            return Err(ScanError::InvalidWorkers);
        }
        Ok(())
    }
}

/// Result of a finished (or cancelled and drained) scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// Totals; partial when `cancelled` is set
    pub stats: AggregateStats,
    /// Whether cancellation fired during the scan
    pub cancelled: bool,
    /// Directories whose listing was attempted
    pub directories: u64,
    /// Listings that failed and were counted as empty
    pub listing_errors: u64,
    /// Walkers that returned early because of cancellation
    pub skipped_directories: u64,
    /// Sizes received and dropped while draining
    pub discarded: u64,
    /// Highest number of listing permits held at once
    pub peak_concurrency: usize,
    /// Wall-clock duration of the scan
    #[serde(rename = "scan_duration_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Concurrent directory-tree scanner.
///
/// # Example
///
/// ```no_run
/// use rustdu::scanner::{ScanConfig, Scanner};
/// use rustdu::signal::CancelToken;
/// use std::path::PathBuf;
///
/// let cancel = CancelToken::new();
/// let scanner = Scanner::new(ScanConfig::default().with_concurrency(8))
///     .with_cancel_token(cancel.clone());
///
/// let outcome = scanner.run(&[PathBuf::from("/usr")]).unwrap();
/// println!("{} ({} directories)", outcome.stats, outcome.directories);
/// ```
pub struct Scanner {
    config: ScanConfig,
    lister: Arc<dyn DirLister>,
    cancel: Mutex<CancelToken>,
    /// Set when the token came from `with_cancel_token`; such a token is
    /// never re-armed.
    external_cancel: bool,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Scanner {
    /// Create a scanner over the real filesystem.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            lister: Arc::new(FsLister::new()),
            cancel: Mutex::new(CancelToken::new()),
            external_cancel: false,
            progress: None,
        }
    }

    /// Use a different listing primitive.
    #[must_use]
    pub fn with_lister(mut self, lister: Arc<dyn DirLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Use an externally controlled cancellation token.
    ///
    /// The caller owns its lifetime: once fired, every later `run` is
    /// cancelled before it starts.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Mutex::new(cancel);
        self.external_cancel = true;
        self
    }

    /// Receive progress callbacks.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The token that cancels the current (or next) scan.
    ///
    /// Unless a token was supplied with [`Scanner::with_cancel_token`], each
    /// scan that terminates leaves a fresh, armed token behind, so a
    /// cancelled scan does not poison later ones.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace a spent internal token once a scan has fully terminated.
    fn rearm_cancel(&self) {
        if self.external_cancel {
            return;
        }
        let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_fired() {
            log::debug!("Re-arming cancellation token for the next scan");
            *cancel = CancelToken::new();
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `roots` and return the totals.
    ///
    /// Returns once every walker has finished, or, after cancellation, once
    /// every in-flight walker has returned and the results have been drained.
    ///
    /// # Errors
    ///
    /// Only setup failures: invalid configuration, or the walker pool or
    /// closer thread failing to start. Listing errors never fail the scan.
    pub fn run(&self, roots: &[PathBuf]) -> Result<ScanOutcome, ScanError> {
        self.config.validate()?;
        let start = Instant::now();
        let cancel = self.cancel_token();

        let mut pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("rustdu-walker-{}", i));
        if let Some(workers) = self.config.workers {
            pool = pool.num_threads(workers);
        }
        let pool = pool.build()?;

        let (sender, closer, receiver) = results::channel(self.config.results_capacity);
        let tracker = Arc::new(CompletionTracker::new());
        let ctx = Arc::new(WalkContext {
            limiter: ConcurrencyLimiter::new(self.config.concurrency),
            cancel: cancel.clone(),
            results: sender,
            tracker: Arc::clone(&tracker),
            lister: Arc::clone(&self.lister),
            counters: WalkCounters::default(),
        });

        if let Some(progress) = &self.progress {
            progress.on_scan_start(roots);
        }
        log::debug!(
            "Scanning {} root(s) with concurrency {} on {} walker thread(s)",
            roots.len(),
            self.config.concurrency,
            pool.current_num_threads()
        );

        // Count the roots first; the closer must never observe a premature zero.
        tracker.add(roots.len());
        let closer_thread = {
            let tracker = Arc::clone(&tracker);
            thread::Builder::new()
                .name("rustdu-closer".to_string())
                .spawn(move || {
                    tracker.wait();
                    closer.close();
                })
        };
        let closer_thread = match closer_thread {
            Ok(handle) => handle,
            Err(e) => {
                // No walker was spawned yet; undo the registration.
                for _ in roots {
                    tracker.done();
                }
                return Err(ScanError::Spawn(e));
            }
        };

        for root in roots {
            let ctx = Arc::clone(&ctx);
            let root = root.clone();
            pool.spawn(move || walk_dir(root, ctx));
        }

        let mut aggregator = Aggregator::new(receiver, cancel);
        if let Some(progress) = &self.progress {
            aggregator = match self.config.progress_interval {
                Some(interval) => aggregator.with_progress(Arc::clone(progress), interval),
                None => aggregator.with_final_report(Arc::clone(progress)),
            };
        }
        let aggregated = aggregator.run();

        if closer_thread.join().is_err() {
            log::error!("Closer thread panicked");
        }
        self.rearm_cancel();

        let counters = &ctx.counters;
        let outcome = ScanOutcome {
            stats: aggregated.stats,
            cancelled: aggregated.cancelled,
            directories: counters.dirs_listed.load(Ordering::Relaxed),
            listing_errors: counters.listing_errors.load(Ordering::Relaxed),
            skipped_directories: counters.skipped_cancelled.load(Ordering::Relaxed),
            discarded: aggregated.discarded,
            peak_concurrency: ctx.limiter.peak(),
            elapsed: start.elapsed(),
        };
        log::debug!(
            "Scan finished in {:?}: {} ({} directories, {} listing errors)",
            outcome.elapsed,
            outcome.stats,
            outcome.directories,
            outcome.listing_errors
        );
        Ok(outcome)
    }
}

/// Scan `roots` with `concurrency` simultaneous listings.
///
/// With `verbose`, running totals are logged every 500 ms. This is the
/// minimal entry point; use [`Scanner`] for cancellation and other options.
///
/// # Errors
///
/// See [`Scanner::run`].
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
///
/// let stats = rustdu::scanner::scan(&[PathBuf::from(".")], 20, false).unwrap();
/// println!("{}", stats);
/// ```
pub fn scan(roots: &[PathBuf], concurrency: usize, verbose: bool) -> Result<AggregateStats, ScanError> {
    let mut config = ScanConfig::default().with_concurrency(concurrency);
    if verbose {
        config = config.with_progress_interval(Some(DEFAULT_PROGRESS_INTERVAL));
    }
    let mut scanner = Scanner::new(config);
    if verbose {
        scanner = scanner.with_progress(Arc::new(LogProgress));
    }
    Ok(scanner.run(roots)?.stats)
}
