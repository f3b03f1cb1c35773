//! Command-line interface definitions for rustdu.
//!
//! # Example
//!
//! ```bash
//! # Total up the current directory
//! rustdu
//!
//! # Several roots, periodic progress, at most 8 concurrent listings
//! rustdu -p -j 8 /usr /var
//!
//! # JSON for scripting, give up after 30 seconds
//! rustdu --output json --timeout 30 ~/src
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Concurrent disk usage counter.
///
/// rustdu walks one or more directory trees in parallel, limiting how many
/// directories are listed at once, and prints the total number of regular
/// files and their combined size.
#[derive(Debug, Parser)]
#[command(name = "rustdu")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan
    #[arg(value_name = "ROOT", default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the final line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report running totals periodically while scanning
    #[arg(short, long)]
    pub progress: bool,

    /// Maximum number of directories listed at the same time
    #[arg(short = 'j', long, value_name = "N", value_parser = parse_positive)]
    pub concurrency: Option<usize>,

    /// Number of walker threads (default: one per CPU)
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub workers: Option<usize>,

    /// Progress reporting interval in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_positive_u64)]
    pub interval: Option<u64>,

    /// Cancel the scan after this many seconds and print partial totals
    #[arg(long, value_name = "SECS", value_parser = parse_positive_u64)]
    pub timeout: Option<u64>,

    /// Cancel the scan when any input arrives on stdin
    #[arg(long)]
    pub abort_on_stdin: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Print sizes in human-readable binary units instead of MB
    #[arg(long)]
    pub human: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Path to a TOML configuration file
    ///
    /// If not specified, the platform-specific default location is used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Parse a strictly positive count.
fn parse_positive(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(n)
}

fn parse_positive_u64(s: &str) -> Result<u64, String> {
    parse_positive(s).map(|n| n as u64)
}
