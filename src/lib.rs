//! rustdu - Concurrent disk usage counter
//!
//! Walks directory trees with one task per subdirectory, bounds how many
//! directories are listed at once, and aggregates file counts and byte totals
//! through a single channel. Cancellation (Ctrl+C, stdin, or a deadline) stops
//! new work, drains in-flight results, and still reports the partial totals.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{JsonOutput, OutputFormat, TextOutput};
use crate::progress::Progress;
use crate::scanner::{FsLister, Scanner};
use crate::signal::CancelToken;

/// Run the application for parsed arguments and return the exit code.
///
/// # Errors
///
/// Returns an error when configuration is invalid, signal handling cannot be
/// set up, the walker pool cannot be built, or output cannot be written.
/// Unreadable directories are not errors; they yield
/// [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    let cancel = CancelToken::new();
    signal::install_handler(&cancel).context("Failed to install Ctrl+C handler")?;
    if config.abort_on_stdin {
        signal::spawn_stdin_abort(&cancel)?;
    }
    if let Some(timeout) = config.timeout() {
        signal::spawn_deadline(&cancel, timeout)?;
    }

    let lister = Arc::new(FsLister::new().with_skip_hidden(config.skip_hidden));
    let mut scanner = Scanner::new(config.to_scan_config(cli.progress))
        .with_lister(lister)
        .with_cancel_token(cancel);
    if cli.progress {
        scanner = scanner.with_progress(Arc::new(Progress::new(cli.quiet)));
    }

    let outcome = scanner.run(&cli.roots).context("Scan failed")?;
    let exit_code = ExitCode::for_outcome(&outcome);

    log::debug!(
        "Scanned {} directories in {:?} (peak {} concurrent listings, {} discarded)",
        outcome.directories,
        outcome.elapsed,
        outcome.peak_concurrency,
        outcome.discarded
    );
    if outcome.listing_errors > 0 {
        log::warn!(
            "{} director{} could not be read",
            outcome.listing_errors,
            if outcome.listing_errors == 1 { "y" } else { "ies" }
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output.unwrap_or_default() {
        OutputFormat::Text => TextOutput::new(&outcome, cli.human).write_to(&mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(&cli.roots, &outcome, exit_code).write_to(&mut out, true)?;
        }
    }
    out.flush()?;

    Ok(exit_code)
}

/// CLI flags take precedence over every config layer.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }
    if let Some(interval) = cli.interval {
        config.progress_interval_ms = interval;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = Some(timeout);
    }
    if cli.abort_on_stdin {
        config.abort_on_stdin = true;
    }
    if cli.skip_hidden {
        config.skip_hidden = true;
    }
}
