//! Plain-text summary line.
//!
//! The default form mirrors classic `du` tools: `"1234 files 56.8 MB"`
//! (decimal megabytes, one decimal). With `human` set the byte total is
//! rendered by `bytesize` instead, e.g. `"1234 files 54.2 MiB"`. A cancelled
//! scan gets an `(interrupted)` suffix.

use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use super::OutputError;
use crate::scanner::ScanOutcome;

/// One-line text rendering of a scan outcome.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    outcome: &'a ScanOutcome,
    human: bool,
}

impl<'a> TextOutput<'a> {
    /// Render `outcome`, optionally with human-readable units.
    #[must_use]
    pub fn new(outcome: &'a ScanOutcome, human: bool) -> Self {
        Self { outcome, human }
    }

    /// The summary line without styling.
    #[must_use]
    pub fn line(&self) -> String {
        let stats = &self.outcome.stats;
        let mut line = if self.human {
            format!("{} files {}", stats.nfiles, ByteSize::b(stats.nbytes))
        } else {
            stats.to_string()
        };
        if self.outcome.cancelled {
            line.push_str(" (interrupted)");
        }
        line
    }

    /// Write the line and a newline.
    ///
    /// Complete totals are bold; partial ones (cancelled scan) are yellow.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        let line = self.line();
        if self.outcome.cancelled {
            writeln!(writer, "{}", line.yellow())?;
        } else {
            writeln!(writer, "{}", line.bold())?;
        }
        Ok(())
    }
}
