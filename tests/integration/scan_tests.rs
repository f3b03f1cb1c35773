use rustdu::error::ExitCode;
use rustdu::progress::ProgressCallback;
use rustdu::scanner::{
    scan, AggregateStats, DirEntry, FsLister, MemoryLister, ScanConfig, Scanner,
};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn write_file(path: &Path, len: usize) {
    File::create(path).unwrap().write_all(&vec![b'x'; len]).unwrap();
}

/// Sequential reference count of regular files and bytes under `dir`.
fn reference_totals(dir: &Path) -> (u64, u64) {
    let mut nfiles = 0;
    let mut nbytes = 0;
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let meta = fs::symlink_metadata(entry.path()).unwrap();
        if meta.is_dir() {
            let (f, b) = reference_totals(&entry.path());
            nfiles += f;
            nbytes += b;
        } else {
            nfiles += 1;
            nbytes += meta.len();
        }
    }
    (nfiles, nbytes)
}

fn build_tree(root: &Path) {
    write_file(&root.join("top.bin"), 1000);
    for i in 0..5 {
        let sub = root.join(format!("dir{}", i));
        fs::create_dir(&sub).unwrap();
        for j in 0..4 {
            write_file(&sub.join(format!("f{}.txt", j)), i * 100 + j);
        }
        let nested = sub.join("nested");
        fs::create_dir(&nested).unwrap();
        write_file(&nested.join("deep.dat"), 7);
    }
    fs::create_dir(root.join("empty")).unwrap();
}

#[test]
fn test_three_files_sixty_bytes() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), 10);
    write_file(&dir.path().join("b"), 20);
    write_file(&dir.path().join("c"), 30);

    let outcome = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 3, nbytes: 60 });
    assert!(!outcome.cancelled);
    assert_eq!(outcome.listing_errors, 0);
    assert_eq!(ExitCode::for_outcome(&outcome), ExitCode::Success);
}

#[test]
fn test_scan_entry_point() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), 10);
    write_file(&dir.path().join("b"), 20);
    write_file(&dir.path().join("c"), 30);

    let stats = scan(&[dir.path().to_path_buf()], 20, false).unwrap();
    assert_eq!(stats.to_string(), "3 files 0.0 MB");
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();

    let outcome = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats::default());
    assert_eq!(outcome.directories, 1);
}

#[test]
fn test_totals_match_filesystem_for_any_concurrency() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let (nfiles, nbytes) = reference_totals(dir.path());

    for n in [1, 2, 3, 8, 20, 64] {
        let outcome = Scanner::new(ScanConfig::default().with_concurrency(n))
            .run(&[dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(outcome.stats.nfiles, nfiles, "concurrency {}", n);
        assert_eq!(outcome.stats.nbytes, nbytes, "concurrency {}", n);
        assert!(outcome.peak_concurrency <= n);
        assert_eq!(outcome.directories, 12);
    }
}

#[test]
fn test_buffered_results_channel() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let expected = reference_totals(dir.path());

    let outcome = Scanner::new(ScanConfig::default().with_results_capacity(64))
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!((outcome.stats.nfiles, outcome.stats.nbytes), expected);
}

#[test]
fn test_repeated_scans_agree() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let scanner = Scanner::new(ScanConfig::default().with_concurrency(4));
    let roots = [dir.path().to_path_buf()];

    let first = scanner.run(&roots).unwrap();
    let second = scanner.run(&roots).unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.directories, second.directories);
}

#[test]
fn test_deep_chain_with_two_permits() {
    let dir = tempdir().unwrap();
    let mut path = dir.path().to_path_buf();
    for _ in 0..50 {
        path = path.join("d");
        fs::create_dir(&path).unwrap();
        write_file(&path.join("f"), 1);
    }

    let outcome = Scanner::new(ScanConfig::default().with_concurrency(2))
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 50, nbytes: 50 });
    assert_eq!(outcome.directories, 51);
}

#[test]
fn test_deep_chain_single_worker_thread() {
    let mut lister = MemoryLister::new();
    let mut path = PathBuf::from("/chain");
    for _ in 0..50 {
        lister = lister.with_dir(path.clone(), vec![DirEntry::dir("d"), DirEntry::file("f", 2)]);
        path = path.join("d");
    }
    lister = lister.with_dir(path, vec![]);

    let outcome = Scanner::new(
        ScanConfig::default()
            .with_concurrency(2)
            .with_workers(Some(1)),
    )
    .with_lister(Arc::new(lister))
    .run(&[PathBuf::from("/chain")])
    .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 50, nbytes: 100 });
}

#[test]
fn test_one_failing_subdirectory() {
    let lister = MemoryLister::new()
        .with_dir(
            "/r",
            vec![
                DirEntry::file("a", 1),
                DirEntry::file("b", 2),
                DirEntry::dir("locked"),
                DirEntry::file("c", 3),
                DirEntry::file("d", 4),
                DirEntry::file("e", 5),
            ],
        )
        .with_failure("/r/locked", ErrorKind::PermissionDenied);

    let outcome = Scanner::new(ScanConfig::default())
        .with_lister(Arc::new(lister))
        .run(&[PathBuf::from("/r")])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 5, nbytes: 15 });
    assert_eq!(outcome.listing_errors, 1);
    assert!(!outcome.cancelled);
    assert_eq!(ExitCode::for_outcome(&outcome), ExitCode::PartialSuccess);
}

#[test]
fn test_missing_root_is_a_listing_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let outcome = Scanner::new(ScanConfig::default()).run(&[missing]).unwrap();

    assert_eq!(outcome.stats, AggregateStats::default());
    assert_eq!(outcome.listing_errors, 1);
}

#[test]
fn test_multiple_roots_share_totals() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    write_file(&a.path().join("x"), 100);
    fs::create_dir(b.path().join("sub")).unwrap();
    write_file(&b.path().join("sub").join("y"), 23);

    let outcome = Scanner::new(ScanConfig::default())
        .run(&[a.path().to_path_buf(), b.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.stats, AggregateStats { nfiles: 2, nbytes: 123 });
    assert_eq!(outcome.directories, 3);
}

#[test]
fn test_no_roots() {
    let outcome = Scanner::new(ScanConfig::default()).run(&[]).unwrap();
    assert_eq!(outcome.stats, AggregateStats::default());
    assert_eq!(outcome.directories, 0);
}

#[test]
fn test_skip_hidden() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("visible"), 10);
    write_file(&dir.path().join(".dotfile"), 20);
    fs::create_dir(dir.path().join(".git")).unwrap();
    write_file(&dir.path().join(".git").join("HEAD"), 40);

    let all = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(all.stats, AggregateStats { nfiles: 3, nbytes: 70 });

    let visible = Scanner::new(ScanConfig::default())
        .with_lister(Arc::new(FsLister::new().with_skip_hidden(true)))
        .run(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(visible.stats, AggregateStats { nfiles: 1, nbytes: 10 });
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real");
    fs::create_dir(&real).unwrap();
    write_file(&real.join("data"), 500);
    std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

    let outcome = Scanner::new(ScanConfig::default())
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    // The link itself is counted as a non-directory entry; its target is not walked twice.
    assert_eq!(outcome.stats.nfiles, 2);
    assert_eq!(outcome.directories, 2);
}

#[derive(Default)]
struct Recorder {
    started: Mutex<usize>,
    ended: Mutex<Vec<(AggregateStats, bool)>>,
}

impl ProgressCallback for Recorder {
    fn on_scan_start(&self, _roots: &[PathBuf]) {
        *self.started.lock().unwrap() += 1;
    }

    fn on_tick(&self, _stats: &AggregateStats) {}

    fn on_scan_end(&self, stats: &AggregateStats, cancelled: bool) {
        self.ended.lock().unwrap().push((*stats, cancelled));
    }
}

#[test]
fn test_progress_sees_final_totals() {
    let lister = MemoryLister::new()
        .with_dir("/p", vec![DirEntry::dir("a"), DirEntry::file("x", 4)])
        .with_dir("/p/a", vec![DirEntry::file("y", 6)])
        .with_latency(Duration::from_millis(5));
    let recorder = Arc::new(Recorder::default());

    let outcome = Scanner::new(ScanConfig::default().with_progress_interval(Some(Duration::from_millis(1))))
        .with_lister(Arc::new(lister))
        .with_progress(recorder.clone())
        .run(&[PathBuf::from("/p")])
        .unwrap();

    assert_eq!(*recorder.started.lock().unwrap(), 1);
    assert_eq!(*recorder.ended.lock().unwrap(), vec![(outcome.stats, false)]);
    assert_eq!(outcome.stats, AggregateStats { nfiles: 2, nbytes: 10 });
}
