//! JSON output formatter for scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "roots": ["/home/user"],
//!   "files": 1234,
//!   "bytes": 56789012,
//!   "directories": 321,
//!   "listing_errors": 0,
//!   "interrupted": false,
//!   "scan_duration_ms": 412,
//!   "exit_code": 0,
//!   "exit_code_name": "DU000"
//! }
//! ```

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use super::OutputError;
use crate::error::ExitCode;
use crate::scanner::ScanOutcome;

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scanned roots, as given
    pub roots: Vec<String>,
    /// Number of files counted
    pub files: u64,
    /// Total bytes counted
    pub bytes: u64,
    /// Directories whose listing was attempted
    pub directories: u64,
    /// Directories that could not be listed
    pub listing_errors: u64,
    /// Whether the scan was cancelled (totals are partial)
    pub interrupted: bool,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DU000")
    pub exit_code_name: String,
}

impl JsonOutput {
    /// Build the JSON document for a finished scan.
    ///
    /// # Example
    ///
    /// ```
    /// use rustdu::error::ExitCode;
    /// use rustdu::output::json::JsonOutput;
    /// use rustdu::scanner::{AggregateStats, ScanOutcome};
    /// use std::path::PathBuf;
    /// use std::time::Duration;
    ///
    /// let outcome = ScanOutcome {
    ///     stats: AggregateStats { nfiles: 3, nbytes: 60 },
    ///     cancelled: false,
    ///     directories: 1,
    ///     listing_errors: 0,
    ///     skipped_directories: 0,
    ///     discarded: 0,
    ///     peak_concurrency: 1,
    ///     elapsed: Duration::from_millis(5),
    /// };
    /// let output = JsonOutput::new(&[PathBuf::from(".")], &outcome, ExitCode::Success);
    /// assert_eq!(output.bytes, 60);
    /// ```
    #[must_use]
    pub fn new(roots: &[PathBuf], outcome: &ScanOutcome, exit_code: ExitCode) -> Self {
        Self {
            roots: roots
                .iter()
                .map(|r| r.to_string_lossy().into_owned())
                .collect(),
            files: outcome.stats.nfiles,
            bytes: outcome.stats.nbytes,
            directories: outcome.directories,
            listing_errors: outcome.listing_errors,
            interrupted: outcome.cancelled,
            scan_duration_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
