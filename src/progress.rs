//! Progress reporting during a scan.
//!
//! The aggregator drives a [`ProgressCallback`]: once when the scan starts,
//! on every ticker period while running, once on cancellation, and once with
//! the final totals. Two implementations are provided:
//!
//! - [`Progress`]: an indicatif spinner showing running totals
//! - [`LogProgress`]: plain `log::info!` lines, one per tick

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::scanner::AggregateStats;

/// Progress callback for scan events.
///
/// All callbacks are invoked from the aggregator thread.
pub trait ProgressCallback: Send + Sync {
    /// Called before any walker starts.
    ///
    /// # Arguments
    ///
    /// * `roots` - The directories being scanned
    fn on_scan_start(&self, _roots: &[PathBuf]) {}

    /// Called on every ticker period with the totals so far.
    fn on_tick(&self, stats: &AggregateStats);

    /// Called when the aggregator switches to draining.
    fn on_cancel(&self) {}

    /// Called once with the final totals.
    ///
    /// # Arguments
    ///
    /// * `stats` - Totals at completion
    /// * `cancelled` - Whether cancellation fired during the scan
    fn on_scan_end(&self, _stats: &AggregateStats, _cancelled: bool) {}
}

/// Spinner-based progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustdu::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(pb) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            f(pb);
        }
    }
}

impl ProgressCallback for Progress {
    fn on_scan_start(&self, roots: &[PathBuf]) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::style());
        pb.set_message(format!("Scanning {} root(s)", roots.len()));
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn on_tick(&self, stats: &AggregateStats) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.set_message(format_running(stats)));
    }

    fn on_cancel(&self) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.set_message("Cancelling, waiting for walkers..."));
    }

    fn on_scan_end(&self, _stats: &AggregateStats, _cancelled: bool) {
        // The final line is printed by the output layer; just clear the spinner.
        if let Some(pb) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take() {
            pb.finish_and_clear();
        }
    }
}

/// Reports each tick through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_tick(&self, stats: &AggregateStats) {
        log::info!("{}", stats);
    }

    fn on_cancel(&self) {
        log::info!("Scan cancelled");
    }
}

/// Running-totals message shown next to the spinner.
fn format_running(stats: &AggregateStats) -> String {
    format!("{} files, {}", stats.nfiles, ByteSize::b(stats.nbytes))
}
