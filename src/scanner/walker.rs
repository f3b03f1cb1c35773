//! Recursive directory walker.
//!
//! # Overview
//!
//! [`walk_dir`] handles exactly one directory and spawns a new task on the
//! current rayon pool for every subdirectory it finds. Each invocation:
//!
//! 1. registers a deferred `done()` with the [`CompletionTracker`]
//! 2. returns immediately if cancellation already fired
//! 3. acquires a listing permit, racing cancellation
//! 4. lists the directory and releases the permit (also on error)
//! 5. spawns sub-walkers for directories and sends file sizes
//!
//! Listing errors are logged and the directory counts as empty. Nothing is
//! returned; a failed directory simply contributes nothing to the totals.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::limiter::ConcurrencyLimiter;
use super::lister::DirLister;
use super::results::SizeSender;
use super::tracker::CompletionTracker;
use super::DirEntry;
use crate::signal::CancelToken;

/// Shared state handed to every walker task of one scan.
pub(crate) struct WalkContext {
    pub(crate) limiter: ConcurrencyLimiter,
    pub(crate) cancel: CancelToken,
    pub(crate) results: SizeSender,
    pub(crate) tracker: Arc<CompletionTracker>,
    pub(crate) lister: Arc<dyn DirLister>,
    pub(crate) counters: WalkCounters,
}

/// Diagnostics gathered across all walkers.
#[derive(Debug, Default)]
pub(crate) struct WalkCounters {
    pub(crate) dirs_listed: AtomicU64,
    pub(crate) listing_errors: AtomicU64,
    pub(crate) skipped_cancelled: AtomicU64,
}

/// Walk one directory. Must run on the scan's rayon pool, and the caller must
/// already have counted this task with `tracker.add(1)`.
pub(crate) fn walk_dir(dir: PathBuf, ctx: Arc<WalkContext>) {
    let _task = ctx.tracker.enter();

    if ctx.cancel.is_fired() {
        ctx.counters.skipped_cancelled.fetch_add(1, Ordering::Relaxed);
        log::trace!("Cancelled before listing {}", dir.display());
        return;
    }

    let Some(entries) = dirents(&dir, &ctx) else {
        ctx.counters.skipped_cancelled.fetch_add(1, Ordering::Relaxed);
        log::trace!("Cancelled while waiting to list {}", dir.display());
        return;
    };

    for entry in entries {
        if entry.is_dir {
            let subdir = dir.join(&entry.name);
            ctx.tracker.add(1);
            let child = Arc::clone(&ctx);
            rayon::spawn(move || walk_dir(subdir, child));
        } else if !ctx.results.send(entry.size) {
            // Receiver gone: the aggregator has returned, nothing to report to.
            break;
        }
    }
}

/// List `dir` while holding a permit.
///
/// Returns `None` only when cancellation won the race for the permit. A
/// listing error yields an empty listing.
fn dirents(dir: &Path, ctx: &WalkContext) -> Option<Vec<DirEntry>> {
    let permit = ctx.limiter.acquire(&ctx.cancel)?;
    let listing = ctx.lister.list(dir);
    drop(permit);

    ctx.counters.dirs_listed.fetch_add(1, Ordering::Relaxed);
    match listing {
        Ok(entries) => {
            log::trace!("Listed {} ({} entries)", dir.display(), entries.len());
            Some(entries)
        }
        Err(e) => {
            ctx.counters.listing_errors.fetch_add(1, Ordering::Relaxed);
            log::warn!("rustdu: {}", e);
            Some(Vec::new())
        }
    }
}
