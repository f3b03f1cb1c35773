//! Cancellation signal and the sources that trigger it.
//!
//! A [`CancelToken`] is a one-shot broadcast: once fired, every clone observes
//! it, both through the cheap [`CancelToken::is_fired`] check and through
//! [`CancelToken::wait_case`], a receiver that becomes permanently ready and
//! can sit in a `crossbeam_channel::select!` next to other operations.
//!
//! The wake-up works by disconnection rather than by message: the token keeps
//! the only `Sender` of a zero-capacity channel and drops it on `fire()`. A
//! disconnected channel wakes every receiver at once and is never consumed.
//!
//! Trigger sources:
//! - [`install_handler`]: Ctrl+C (SIGINT/SIGTERM/SIGHUP via `ctrlc`)
//! - [`spawn_stdin_abort`]: one byte (or EOF) on standard input
//! - [`spawn_deadline`]: a timeout
//!
//! # Usage
//!
//! ```rust,no_run
//! use rustdu::signal::{install_handler, CancelToken};
//!
//! let token = CancelToken::new();
//! install_handler(&token).expect("Failed to install signal handler");
//!
//! // Pass clones of the token to the scanner; check it anywhere.
//! if token.is_fired() {
//!     println!("Cancelled, draining...");
//! }
//! ```
//!
//! # Exit Codes
//!
//! When a signal fires the token, the application should exit with code 130
//! (128 + SIGINT) after printing whatever totals were accumulated.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// One-shot, multi-reader cancellation signal.
///
/// Cloning is cheap and all clones share state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl CancelToken {
    /// Create an armed token.
    #[must_use]
    pub fn new() -> Self {
        let (trigger, done) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                done,
            }),
        }
    }

    /// Fire the token.
    ///
    /// Returns `true` for the call that actually performed the transition;
    /// every later call is a no-op returning `false`.
    pub fn fire(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Dropping the only sender disconnects `done` for every reader.
        let sender = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);
        log::debug!("Cancellation fired");
        true
    }

    /// Non-blocking check of the fired state.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the token fires.
    ///
    /// Intended for `select!`: `recv(token.wait_case()) -> _ => ...`. It
    /// never yields a value, only the disconnection.
    #[must_use]
    pub fn wait_case(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until the token fires or `timeout` elapses.
    ///
    /// Returns `true` if the token fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_fired() {
            return true;
        }
        let _ = self.inner.done.recv_timeout(timeout);
        self.is_fired()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),

    /// Failed to start a trigger thread.
    #[error("Failed to start cancellation trigger thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Token the process-wide Ctrl+C hook currently fires.
///
/// `ctrlc` allows one handler per process, so the handler is installed once
/// and retargeted on later calls (tests call `run_app()` repeatedly).
static CURRENT_TARGET: OnceLock<Mutex<Option<CancelToken>>> = OnceLock::new();

/// Route Ctrl+C to `token`.
///
/// The first call installs the OS handler; later calls only swap the target.
/// On interrupt, "Interrupted. Cleaning up..." is printed to stderr and the
/// current token fires.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if `ctrlc` refuses the handler for a
/// reason other than one already being registered.
pub fn install_handler(token: &CancelToken) -> Result<(), SignalError> {
    let mut first_install = false;
    let target = CURRENT_TARGET.get_or_init(|| {
        first_install = true;
        Mutex::new(None)
    });
    *target.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

    if !first_install {
        return Ok(());
    }

    match ctrlc::set_handler(|| {
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
        let _ = std::io::stderr().flush();

        if let Some(target) = CURRENT_TARGET.get() {
            if let Some(token) = target
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
            {
                token.fire();
            }
        }
        log::info!("Shutdown signal received");
    }) {
        Ok(()) => Ok(()),
        Err(ctrlc::Error::MultipleHandlers) => {
            // Registered elsewhere (embedding application, another test).
            // Manual `fire()` keeps working.
            log::debug!("Ctrl+C handler already registered, continuing without hook");
            Ok(())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}

/// Fire `token` when a byte (or EOF) arrives on standard input.
///
/// The reader thread is detached: it stays parked in `read` if no input ever
/// arrives, which is harmless for a process that exits after the scan.
///
/// # Errors
///
/// Returns [`SignalError::Spawn`] if the thread cannot be created.
pub fn spawn_stdin_abort(token: &CancelToken) -> Result<(), SignalError> {
    let token = token.clone();
    thread::Builder::new()
        .name("rustdu-stdin-abort".to_string())
        .spawn(move || {
            let mut byte = [0u8; 1];
            let _ = std::io::stdin().read(&mut byte);
            if token.fire() {
                eprintln!("user abort");
                log::info!("Abort requested from standard input");
            }
        })?;
    Ok(())
}

/// Fire `token` once `timeout` has elapsed, unless it fired earlier.
///
/// # Errors
///
/// Returns [`SignalError::Spawn`] if the timer thread cannot be created.
pub fn spawn_deadline(token: &CancelToken, timeout: Duration) -> Result<(), SignalError> {
    let token = token.clone();
    thread::Builder::new()
        .name("rustdu-deadline".to_string())
        .spawn(move || {
            if !token.wait_timeout(timeout) && token.fire() {
                log::info!("Deadline of {:?} reached, cancelling scan", timeout);
            }
        })?;
    Ok(())
}
