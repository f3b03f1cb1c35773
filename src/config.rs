//! Application configuration management.
//!
//! Settings are layered with `figment`, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. `RUSTDU_*` environment variables (e.g. `RUSTDU_CONCURRENCY=8`)
//!
//! CLI flags are applied on top by the caller.
//!
//! # Example file
//!
//! ```toml
//! concurrency = 32
//! progress_interval_ms = 250
//! skip_hidden = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::{ScanConfig, DEFAULT_CONCURRENCY};

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "RUSTDU_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A provider failed or a value had the wrong type
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A value parsed but is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of directories listed at once.
    pub concurrency: usize,
    /// Walker thread count; `None` lets rayon decide.
    pub workers: Option<usize>,
    /// Ticker period when progress reporting is on.
    pub progress_interval_ms: u64,
    /// Results channel capacity (0 = rendezvous).
    pub results_capacity: usize,
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
    /// Cancel the scan after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Cancel the scan when a byte arrives on stdin.
    pub abort_on_stdin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            workers: None,
            progress_interval_ms: 500,
            results_capacity: 0,
            skip_hidden: false,
            timeout_secs: None,
            abort_on_stdin: false,
        }
    }
}

impl Config {
    /// Load the configuration from all layers.
    ///
    /// An explicit `path` must exist. When `path` is `None` the platform
    /// default file is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing (explicit path only), cannot
    /// be parsed, or holds out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Like [`Config::load`], reading environment variables that start with
    /// `env_prefix` instead of `RUSTDU_`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_with_env_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().filter(|p| p.exists()),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Loading config from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(env_prefix));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Default platform-specific configuration path, if one can be determined.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "rustdu", "rustdu").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject values the scanner cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.progress_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "progress_interval_ms must be at least 1".into(),
            ));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Ticker period as a `Duration`.
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Deadline as a `Duration`, if set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Scanner settings derived from this configuration.
    ///
    /// `progress` decides whether the aggregator ticks at all.
    #[must_use]
    pub fn to_scan_config(&self, progress: bool) -> ScanConfig {
        ScanConfig::default()
            .with_concurrency(self.concurrency)
            .with_workers(self.workers)
            .with_results_capacity(self.results_capacity)
            .with_progress_interval(progress.then(|| self.progress_interval()))
    }
}
