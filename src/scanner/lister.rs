//! Directory listing primitives.
//!
//! Walkers never touch the filesystem directly; they go through a
//! [`DirLister`]. [`FsLister`] is the real implementation, [`MemoryLister`]
//! serves an in-memory tree (with optional injected failures and latency) for
//! tests and benchmarks.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::{DirEntry, ScanError};

/// Lists the immediate children of one directory.
pub trait DirLister: Send + Sync {
    /// Return every entry of `dir`.
    ///
    /// # Errors
    ///
    /// Any failure to open or read the directory. Walkers log the error and
    /// treat the directory as empty.
    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, ScanError>;
}

/// Lists directories with `std::fs::read_dir`.
///
/// Entry metadata comes from `DirEntry::metadata`, which does not traverse
/// symlinks: a link is reported as a non-directory sized like the link itself,
/// so link cycles cannot make the walk recurse forever.
#[derive(Debug, Clone, Default)]
pub struct FsLister {
    skip_hidden: bool,
}

impl FsLister {
    /// Create a lister that reports every entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip entries whose name starts with `.`.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }
}

impl DirLister for FsLister {
    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, ScanError> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| ScanError::from_io(dir, e))?;
            let name = item.file_name().to_string_lossy().into_owned();

            if self.skip_hidden && name.starts_with('.') {
                log::trace!("Skipping hidden entry: {}", item.path().display());
                continue;
            }

            // Entries can vanish between readdir and lstat; skip those.
            let metadata = match item.metadata() {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("Entry disappeared during scan: {}", item.path().display());
                    continue;
                }
                Err(e) => return Err(ScanError::from_io(&item.path(), e)),
            };

            if metadata.is_dir() {
                entries.push(DirEntry::dir(name));
            } else {
                entries.push(DirEntry::file(name, metadata.len()));
            }
        }
        Ok(entries)
    }
}

/// In-memory directory tree.
///
/// # Example
///
/// ```
/// use rustdu::scanner::{DirEntry, DirLister, MemoryLister};
/// use std::path::Path;
///
/// let lister = MemoryLister::new()
///     .with_dir("/root", vec![DirEntry::file("a", 10), DirEntry::dir("sub")])
///     .with_dir("/root/sub", vec![DirEntry::file("b", 5)]);
///
/// assert_eq!(lister.list(Path::new("/root")).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLister {
    dirs: HashMap<PathBuf, Vec<DirEntry>>,
    failing: HashMap<PathBuf, ErrorKind>,
    latency: Option<Duration>,
}

impl MemoryLister {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the listing for `path`.
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>, entries: Vec<DirEntry>) -> Self {
        self.dirs.insert(path.into(), entries);
        self
    }

    /// Make listing `path` fail with `kind`.
    #[must_use]
    pub fn with_failure(mut self, path: impl Into<PathBuf>, kind: ErrorKind) -> Self {
        self.failing.insert(path.into(), kind);
        self
    }

    /// Sleep for `latency` inside every listing call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sum of sizes and number of files reachable from `root`, computed
    /// sequentially. Failing directories contribute nothing.
    #[must_use]
    pub fn expected_totals(&self, root: &Path) -> (u64, u64) {
        let mut nfiles = 0;
        let mut nbytes = 0;
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if self.failing.contains_key(&dir) {
                continue;
            }
            for entry in self.dirs.get(&dir).into_iter().flatten() {
                if entry.is_dir {
                    stack.push(dir.join(&entry.name));
                } else {
                    nfiles += 1;
                    nbytes += entry.size;
                }
            }
        }
        (nfiles, nbytes)
    }
}

impl DirLister for MemoryLister {
    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, ScanError> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        if let Some(kind) = self.failing.get(dir) {
            return Err(ScanError::from_io(dir, std::io::Error::from(*kind)));
        }
        self.dirs
            .get(dir)
            .cloned()
            .ok_or_else(|| ScanError::NotFound(dir.to_path_buf()))
    }
}
