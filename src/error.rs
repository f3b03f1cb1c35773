//! Structured error handling and exit codes.

use serde::Serialize;

use crate::scanner::ScanOutcome;

/// Exit codes for the rustdu application.
///
/// - 0: Success (scan completed, every directory listed)
/// - 1: General error (unexpected failure before or outside the scan)
/// - 3: Partial success (completed, but some directories could not be listed)
/// - 130: Interrupted (cancellation fired; totals are partial)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed without listing errors.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Partial success: Scan completed but some listings failed.
    PartialSuccess = 3,
    /// Interrupted: Scan was cancelled (Ctrl+C, stdin, or timeout).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DU000",
            Self::GeneralError => "DU001",
            Self::PartialSuccess => "DU003",
            Self::Interrupted => "DU130",
        }
    }

    /// Exit code describing a finished scan.
    ///
    /// Cancellation takes precedence over listing errors.
    #[must_use]
    pub fn for_outcome(outcome: &ScanOutcome) -> Self {
        if outcome.cancelled {
            Self::Interrupted
        } else if outcome.listing_errors > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DU001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
