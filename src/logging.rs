//! Logging setup for rustdu.
//!
//! Diagnostics go through the `log` facade to an `env_logger` backend on
//! stderr, so they never mix with the result line on stdout. The level comes
//! from `RUST_LOG` when set, otherwise from the CLI flags:
//!
//! | flags | level |
//! |-------|-------|
//! | `-q`  | error |
//! | none  | info  |
//! | `-v`  | debug |
//! | `-vv` | trace |
//!
//! Unreadable directories are reported at `warn`, so `-q` hides them while the
//! exit code still reflects them.

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logger from CLI verbosity flags.
///
/// Returns `false` if a logger was already installed (e.g. by a test
/// harness); the existing logger is left in place.
///
/// # Example
///
/// ```rust,no_run
/// use rustdu::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("walker pool ready");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    configure_format(&mut builder, verbose);

    let installed = builder.try_init().is_ok();
    if installed && !from_env {
        log::debug!("Logging initialized at level: {:?}", level);
    }
    installed
}

/// Map `-v` count and `-q` to a level filter. Quiet wins.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Debug builds get timestamps (and the module path once `-v` is given);
/// release builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_millis();
            let level = record.level();
            let style = buf.default_level_style(level);
            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {style}{:<5}{style:#} {}", timestamp, level, record.args())
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        });
    }
}
