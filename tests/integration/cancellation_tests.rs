use rustdu::error::ExitCode;
use rustdu::scanner::{
    AggregateStats, DirEntry, DirLister, MemoryLister, ScanConfig, ScanError, ScanOutcome, Scanner,
};
use rustdu::signal::{spawn_deadline, CancelToken};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Fires the token as soon as the first listing completes.
struct FireAfterFirstListing {
    inner: MemoryLister,
    cancel: CancelToken,
}

impl DirLister for FireAfterFirstListing {
    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, ScanError> {
        let listing = self.inner.list(dir);
        self.cancel.fire();
        listing
    }
}

/// Root with `files` files plus `dirs` subdirectories of 10 files each.
fn wide_tree(files: usize, dirs: usize) -> MemoryLister {
    let mut root = Vec::new();
    for i in 0..files {
        root.push(DirEntry::file(format!("f{}", i), 1));
    }
    let mut lister = MemoryLister::new();
    for d in 0..dirs {
        let name = format!("d{}", d);
        root.push(DirEntry::dir(name.clone()));
        let children = (0..10).map(|i| DirEntry::file(format!("g{}", i), 1)).collect();
        lister = lister.with_dir(format!("/w/{}", name), children);
    }
    lister.with_dir("/w", root)
}

/// Run `scanner` on a helper thread and fail if it does not return in time.
fn run_with_deadline(scanner: Scanner, roots: Vec<PathBuf>, limit: Duration) -> ScanOutcome {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let outcome = scanner.run(&roots);
        let _ = tx.send(outcome);
    });
    rx.recv_timeout(limit)
        .expect("scan did not return; a walker is stuck")
        .unwrap()
}

#[test]
fn test_cancel_before_start() {
    let cancel = CancelToken::new();
    cancel.fire();
    let lister = MemoryLister::new().with_dir("/r", vec![DirEntry::file("a", 10)]);

    let outcome = Scanner::new(ScanConfig::default())
        .with_lister(Arc::new(lister))
        .with_cancel_token(cancel)
        .run(&[PathBuf::from("/r")])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 0, nbytes: 0 });
    assert!(outcome.cancelled);
    assert_eq!(outcome.directories, 0);
    assert_eq!(outcome.skipped_directories, 1);
    assert_eq!(ExitCode::for_outcome(&outcome), ExitCode::Interrupted);
}

#[test]
fn test_cancel_mid_scan_drains_in_flight_sends() {
    let cancel = CancelToken::new();
    let lister = Arc::new(FireAfterFirstListing {
        inner: wide_tree(200, 10),
        cancel: cancel.clone(),
    });
    let scanner = Scanner::new(ScanConfig::default().with_results_capacity(0))
        .with_lister(lister)
        .with_cancel_token(cancel);

    let outcome = run_with_deadline(scanner, vec![PathBuf::from("/w")], Duration::from_secs(10));

    assert!(outcome.cancelled);
    // Only the root was listed; every one of its files was either counted or drained.
    assert_eq!(outcome.directories, 1);
    assert_eq!(outcome.skipped_directories, 10);
    assert_eq!(outcome.stats.nfiles + outcome.discarded, 200);
    assert!(outcome.stats.nfiles <= 200);
}

#[test]
fn test_no_walker_outlives_cancelled_scan() {
    let cancel = CancelToken::new();
    let lister = Arc::new(FireAfterFirstListing {
        inner: wide_tree(500, 20),
        cancel: cancel.clone(),
    });
    let scanner = Scanner::new(ScanConfig::default().with_concurrency(2))
        .with_lister(lister.clone())
        .with_cancel_token(cancel);

    let outcome = run_with_deadline(scanner, vec![PathBuf::from("/w")], Duration::from_secs(10));
    assert!(outcome.cancelled);

    // Every walker task holds a reference to the lister; once they have all
    // returned, only ours is left.
    let start = Instant::now();
    while Arc::strong_count(&lister) > 1 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(Arc::strong_count(&lister), 1);
}

#[test]
fn test_cancel_from_another_thread() {
    // 100 directories at 20ms each with one permit: about two seconds uncancelled.
    let lister = wide_tree(0, 100).with_latency(Duration::from_millis(20));
    let scanner = Scanner::new(ScanConfig::default().with_concurrency(1))
        .with_lister(Arc::new(lister));
    let cancel = scanner.cancel_token();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        cancel.fire()
    });

    let outcome = run_with_deadline(scanner, vec![PathBuf::from("/w")], Duration::from_secs(10));

    assert!(canceller.join().unwrap());
    assert!(outcome.cancelled);
    assert!(outcome.directories < 101);
    assert_eq!(outcome.stats.nfiles + outcome.discarded, (outcome.directories - 1) * 10);
}

#[test]
fn test_deadline_cancels_slow_scan() {
    let lister = wide_tree(5, 200).with_latency(Duration::from_millis(25));
    let scanner = Scanner::new(ScanConfig::default().with_concurrency(1))
        .with_lister(Arc::new(lister));
    spawn_deadline(&scanner.cancel_token(), Duration::from_millis(100)).unwrap();

    let started = Instant::now();
    let outcome = run_with_deadline(scanner, vec![PathBuf::from("/w")], Duration::from_secs(10));

    assert!(outcome.cancelled);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(outcome.skipped_directories > 0);
}

#[test]
fn test_cancelled_totals_never_exceed_full_totals() {
    let lister = wide_tree(50, 30);
    let (full_files, full_bytes) = lister.expected_totals(Path::new("/w"));

    let cancel = CancelToken::new();
    let firing = Arc::new(FireAfterFirstListing {
        inner: lister,
        cancel: cancel.clone(),
    });
    let outcome = Scanner::new(ScanConfig::default())
        .with_lister(firing)
        .with_cancel_token(cancel)
        .run(&[PathBuf::from("/w")])
        .unwrap();

    assert!(outcome.stats.nfiles <= full_files);
    assert!(outcome.stats.nbytes <= full_bytes);
}

#[test]
fn test_rescan_after_cancel_starts_armed() {
    let lister = MemoryLister::new().with_dir("/r", vec![DirEntry::file("a", 10), DirEntry::file("b", 20)]);
    let scanner = Scanner::new(ScanConfig::default()).with_lister(Arc::new(lister));
    let roots = [PathBuf::from("/r")];

    let first = scanner.run(&roots).unwrap();
    assert_eq!(first.stats, AggregateStats { nfiles: 2, nbytes: 30 });

    // Fired between scans: applies to the next scan only.
    scanner.cancel_token().fire();
    let cancelled = scanner.run(&roots).unwrap();
    assert!(cancelled.cancelled);
    assert_eq!(cancelled.stats, AggregateStats::default());

    let third = scanner.run(&roots).unwrap();
    assert!(!third.cancelled);
    assert_eq!(third.stats, AggregateStats { nfiles: 2, nbytes: 30 });
    assert!(!scanner.cancel_token().is_fired());
}

#[test]
fn test_injected_token_stays_fired_across_scans() {
    let cancel = CancelToken::new();
    let lister = MemoryLister::new().with_dir("/r", vec![DirEntry::file("a", 10)]);
    let scanner = Scanner::new(ScanConfig::default())
        .with_lister(Arc::new(lister))
        .with_cancel_token(cancel.clone());

    cancel.fire();
    for _ in 0..2 {
        let outcome = scanner.run(&[PathBuf::from("/r")]).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.stats, AggregateStats::default());
    }
    assert!(scanner.cancel_token().is_fired());
}
