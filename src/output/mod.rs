//! Output formatters for scan results.
//!
//! This module renders a finished [`ScanOutcome`](crate::scanner::ScanOutcome):
//! - [`text`]: the classic one-line `"N files X.X MB"` summary
//! - [`json`]: machine-readable JSON for scripting
//!
//! # Example
//!
//! ```no_run
//! use rustdu::error::ExitCode;
//! use rustdu::output::json::JsonOutput;
//! use rustdu::scanner::{ScanConfig, Scanner};
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from(".")];
//! let outcome = Scanner::new(ScanConfig::default()).run(&roots).unwrap();
//! let output = JsonOutput::new(&roots, &outcome, ExitCode::for_outcome(&outcome));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

use clap::ValueEnum;

// Re-export main types
pub use json::JsonOutput;
pub use text::TextOutput;

/// Output format for the final result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable summary line
    #[default]
    Text,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Errors that can occur while writing output.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing output: {0}")]
    Io(#[from] std::io::Error),
}
