//! Concurrent directory-tree scanning.
//!
//! This module provides functionality for:
//! - Recursive fan-out over a directory tree, one task per directory
//! - Bounding simultaneously open directories with a counting semaphore
//! - Aggregating file counts and byte totals on a single consumer
//! - Cooperative cancellation that never leaves a walker blocked
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`limiter`]: bounded semaphore ([`ConcurrencyLimiter`])
//! - [`tracker`]: outstanding-walker counter ([`CompletionTracker`])
//! - [`results`]: sizes channel with an explicit end-of-stream marker
//! - [`lister`]: directory listing primitives ([`DirLister`])
//! - [`walker`]: the recursive traversal task
//! - [`aggregator`]: the consumer loop ([`Aggregator`])
//! - [`engine`]: wiring it all together ([`Scanner`], [`scan`])
//!
//! # Example
//!
//! ```no_run
//! use rustdu::scanner::{ScanConfig, Scanner};
//! use std::path::PathBuf;
//!
//! let scanner = Scanner::new(ScanConfig::default());
//! let outcome = scanner.run(&[PathBuf::from(".")]).unwrap();
//! println!("{}", outcome.stats);
//! ```

pub mod aggregator;
pub mod engine;
pub mod limiter;
pub mod lister;
pub mod results;
pub mod tracker;
pub mod walker;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

// Re-export main types
pub use aggregator::{AggregateStats, Aggregator, AggregatorOutcome, AggregatorState};
pub use engine::{scan, ScanConfig, ScanOutcome, Scanner};
pub use limiter::{ConcurrencyLimiter, Permit, DEFAULT_CONCURRENCY};
pub use lister::{DirLister, FsLister, MemoryLister};
pub use tracker::{CompletionTracker, TaskGuard};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name (last path component)
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes; meaningful only when `is_dir` is false
    pub size: u64,
}

impl DirEntry {
    /// A non-directory entry of `size` bytes.
    #[must_use]
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    /// A directory entry.
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Errors that can occur while scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing a directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The concurrency limit must allow at least one listing.
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,

    /// The walker pool must have at least one thread.
    #[error("Worker count must be at least 1")]
    InvalidWorkers,

    /// The walker thread pool could not be built.
    #[error("Failed to build walker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The closer thread could not be started.
    #[error("Failed to start closer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ScanError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::NotADirectory => Self::NotADirectory(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
