//! Scanner module - walks directory trees and feeds files to the checker

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Instant;
use walkdir::WalkDir;

use crate::config::{ErrorPolicy, ScanConfig};
use crate::error::ScanError;
use crate::models::{Digest, HashAlgorithm, ScanStats};
use crate::progress::ProgressReporter;
use crate::registry::FileChecker;
use crate::summary::ScanSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootState {
    Scanning,
    Scanned,
}

/// A classified walk entry waiting to be applied to the counters
#[derive(Debug)]
enum WalkItem {
    Directory(PathBuf),
    File(PathBuf),
    Skipped(PathBuf, &'static str),
}

/// Per-walk tallies used for progress lines
#[derive(Debug)]
struct WalkCounts {
    files: u64,
    errors: u64,
    started: Instant,
}

impl WalkCounts {
    fn new() -> Self {
        Self {
            files: 0,
            errors: 0,
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Exclusive right to walk one root; released on drop
struct RootClaim<'a> {
    scanner: &'a DirectoryScanner,
    root: &'a Path,
    completed: bool,
}

impl Drop for RootClaim<'_> {
    fn drop(&mut self) {
        self.scanner.release_root(self.root, self.completed);
    }
}

/// Walks scan roots and registers every file with a [`FileChecker`].
///
/// The checker and the summary are shared; one scanner may be used from
/// several threads at once. Each canonical root is walked at most once for the
/// lifetime of the scanner.
pub struct DirectoryScanner {
    config: ScanConfig,
    checker: Arc<dyn FileChecker>,
    summary: Arc<ScanSummary>,
    reporter: ProgressReporter,
    pool: Option<rayon::ThreadPool>,
    roots: Mutex<HashMap<PathBuf, RootState>>,
    roots_changed: Condvar,
}

impl DirectoryScanner {
    /// Create a scanner with a fresh summary
    pub fn new(config: ScanConfig, checker: Arc<dyn FileChecker>) -> Result<Self, ScanError> {
        Self::with_summary(config, checker, Arc::new(ScanSummary::new()))
    }

    /// Create a scanner that accumulates into an existing summary
    pub fn with_summary(
        config: ScanConfig,
        checker: Arc<dyn FileChecker>,
        summary: Arc<ScanSummary>,
    ) -> Result<Self, ScanError> {
        let pool = if config.is_parallel() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.effective_threads())
                .thread_name(|i| format!("hasher-{}", i))
                .build()?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            reporter: ProgressReporter::new(config.show_progress),
            config,
            checker,
            summary,
            pool,
            roots: Mutex::new(HashMap::new()),
            roots_changed: Condvar::new(),
        })
    }

    /// The shared counters
    pub fn summary(&self) -> &Arc<ScanSummary> {
        &self.summary
    }

    /// Current counter values
    pub fn stats(&self) -> ScanStats {
        self.summary.snapshot()
    }

    /// The scanner configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Hash function used by the checker
    pub fn algorithm(&self) -> HashAlgorithm {
        self.checker.algorithm()
    }

    /// Whether the canonical form of `root` has been fully walked
    pub fn is_scanned(&self, root: impl AsRef<Path>) -> bool {
        let Ok(canonical) = std::fs::canonicalize(root.as_ref()) else {
            return false;
        };
        self.roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&canonical)
            == Some(&RootState::Scanned)
    }

    /// Scan every configured root in order, stopping at the first failure
    pub fn scan_all(&self) -> Result<(), ScanError> {
        for root in &self.config.roots {
            self.scan(root)?;
        }
        Ok(())
    }

    /// Walk `root` and register every file under it.
    ///
    /// A root whose canonical path was already scanned is a no-op returning
    /// `Ok(())`. If another thread is walking the same root, this call waits
    /// for it: it returns `Ok(())` once that walk succeeds, or walks the root
    /// itself if that walk failed.
    pub fn scan(&self, root: impl AsRef<Path>) -> Result<(), ScanError> {
        let root = root.as_ref();
        let canonical =
            std::fs::canonicalize(root).map_err(|e| ScanError::path_resolution(root, &e))?;

        let Some(mut claim) = self.claim_root(&canonical) else {
            info!("Directory already scanned, skipping: {}", canonical.display());
            return Ok(());
        };

        info!("Starting directory scan: {}", canonical.display());
        self.reporter.report_start(
            &canonical,
            self.checker.algorithm(),
            self.config.error_policy,
        );
        let start = Instant::now();

        let result = self.walk(&canonical);
        claim.completed = result.is_ok();
        drop(claim);

        if result.is_ok() {
            let elapsed = start.elapsed().as_millis() as u64;
            info!(
                "Directory scan completed: {} ({}ms)",
                canonical.display(),
                elapsed
            );
            self.reporter
                .report_done(&canonical, self.summary.snapshot(), elapsed);
        }
        result
    }

    /// Claim `root` for walking; `None` once it has been scanned.
    ///
    /// Blocks while another thread holds the claim.
    fn claim_root<'a>(&'a self, root: &'a Path) -> Option<RootClaim<'a>> {
        let mut roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match roots.get(root).copied() {
                Some(RootState::Scanned) => return None,
                Some(RootState::Scanning) => {
                    debug!("Waiting for running scan of {}", root.display());
                    roots = self
                        .roots_changed
                        .wait(roots)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    roots.insert(root.to_path_buf(), RootState::Scanning);
                    return Some(RootClaim {
                        scanner: self,
                        root,
                        completed: false,
                    });
                }
            }
        }
    }

    /// Finish a claim: keep it as scanned, or drop it so the root can be retried
    fn release_root(&self, root: &Path, completed: bool) {
        let mut roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        if completed {
            roots.insert(root.to_path_buf(), RootState::Scanned);
        } else {
            roots.remove(root);
        }
        self.roots_changed.notify_all();
    }

    fn walk(&self, root: &Path) -> Result<(), ScanError> {
        let batch_size = self.config.effective_batch_size();
        let mut pending: Vec<WalkItem> = Vec::with_capacity(batch_size);
        let mut counts = WalkCounts::new();

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    pending.push(self.classify(entry));
                    if pending.len() >= batch_size {
                        self.flush(root, &mut pending, &mut counts)?;
                    }
                }
                Err(err) => {
                    self.flush(root, &mut pending, &mut counts)?;
                    let error = ScanError::walk(&err);
                    self.reporter.report_error(&error);
                    match self.config.error_policy {
                        ErrorPolicy::FailFast => return Err(error),
                        ErrorPolicy::Resilient => {
                            self.summary.add_error();
                            counts.errors += 1;
                            warn!("Cannot read directory entry: {}", error.message);
                        }
                    }
                }
            }
        }

        self.flush(root, &mut pending, &mut counts)
    }

    fn classify(&self, entry: walkdir::DirEntry) -> WalkItem {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            return WalkItem::Directory(entry.into_path());
        }

        if file_type.is_symlink() {
            let path = entry.into_path();
            return match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => WalkItem::Skipped(path, "link to directory"),
                Ok(meta) if !meta.is_file() => WalkItem::Skipped(path, "link to special file"),
                Ok(meta) => self.file_item(path, meta.len()),
                // Dangling link: let the digest step report it.
                Err(_) => WalkItem::File(path),
            };
        }

        if !file_type.is_file() {
            return WalkItem::Skipped(entry.into_path(), "special file");
        }

        if self.config.skip_empty {
            if let Ok(meta) = entry.metadata() {
                return self.file_item(entry.into_path(), meta.len());
            }
        }
        WalkItem::File(entry.into_path())
    }

    fn file_item(&self, path: PathBuf, len: u64) -> WalkItem {
        if self.config.skip_empty && len == 0 {
            WalkItem::Skipped(path, "empty file")
        } else {
            WalkItem::File(path)
        }
    }

    /// Digest the files of a batch, then apply the batch in walk order
    fn flush(
        &self,
        root: &Path,
        pending: &mut Vec<WalkItem>,
        counts: &mut WalkCounts,
    ) -> Result<(), ScanError> {
        if pending.is_empty() {
            return Ok(());
        }

        let items = std::mem::take(pending);
        let digests = self.compute_digests(&items);

        for (item, digest) in items.iter().zip(digests) {
            match item {
                WalkItem::Directory(path) => {
                    self.summary.add_directory();
                    debug!("Directory found: {}", path.display());
                }
                WalkItem::Skipped(path, reason) => {
                    self.summary.add_skipped();
                    debug!("Skipping {}: {}", path.display(), reason);
                }
                WalkItem::File(path) => {
                    self.summary.add_file();
                    counts.files += 1;

                    let result = digest.unwrap_or_else(|| self.checker.digest(path));
                    let outcome = self.apply_digest(path, result, counts);

                    if self.config.is_progress_due(counts.files) {
                        info!(
                            "{} files processed, errors: {}...",
                            counts.files, counts.errors
                        );
                        self.reporter.report_progress(
                            root,
                            self.summary.snapshot(),
                            counts.elapsed_ms(),
                        );
                    }
                    outcome?;
                }
            }
        }
        Ok(())
    }

    fn compute_digests(&self, items: &[WalkItem]) -> Vec<Option<Result<Digest, ScanError>>> {
        let digest = |item: &WalkItem| match item {
            WalkItem::File(path) => Some(self.checker.digest(path)),
            _ => None,
        };

        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(digest).collect()),
            None => items.iter().map(digest).collect(),
        }
    }

    fn apply_digest(
        &self,
        path: &Path,
        result: Result<Digest, ScanError>,
        counts: &mut WalkCounts,
    ) -> Result<(), ScanError> {
        match result {
            Ok(digest) => {
                self.checker.register(path, &digest);
                debug!("File was checked: {} ({})", path.display(), digest);
                Ok(())
            }
            Err(error) => {
                self.summary.add_error();
                counts.errors += 1;
                warn!("Cannot check file {}: {}", path.display(), error.message);
                self.reporter.report_error(&error);
                match self.config.error_policy {
                    ErrorPolicy::FailFast => Err(error),
                    ErrorPolicy::Resilient => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorKind;
    use crate::hasher::DigestComputer;
    use crate::registry::DuplicateRegistry;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Checker that names digests after the file and fails on request
    #[derive(Default)]
    struct MockChecker {
        fail_on: Option<&'static str>,
        fail_all: bool,
        delay: Option<Duration>,
        digests: AtomicUsize,
        registered: Mutex<Vec<String>>,
    }

    impl MockChecker {
        fn failing_on(name: &'static str) -> Self {
            Self {
                fail_on: Some(name),
                ..Default::default()
            }
        }

        fn failing_all() -> Self {
            Self {
                fail_all: true,
                ..Default::default()
            }
        }

        fn slow(delay: Duration, fail_all: bool) -> Self {
            Self {
                delay: Some(delay),
                fail_all,
                ..Default::default()
            }
        }

        fn registered_names(&self) -> Vec<String> {
            self.registered
                .lock()
                .unwrap()
                .iter()
                .map(|p| {
                    Path::new(p)
                        .file_name()
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect()
        }
    }

    impl FileChecker for MockChecker {
        fn digest(&self, path: &Path) -> Result<Digest, ScanError> {
            self.digests.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if self.fail_all || self.fail_on == Some(name.as_str()) {
                return Err(ScanError::file_check(path, format!("mock error for {}", name)));
            }
            Ok(Digest::new(format!("hash-{}", name)))
        }

        fn register(&self, path: &Path, _digest: &Digest) {
            self.registered
                .lock()
                .unwrap()
                .push(path.to_string_lossy().into_owned());
        }

        fn algorithm(&self) -> HashAlgorithm {
            HashAlgorithm::Sha256
        }
    }

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
    }

    fn scanner_with(config: ScanConfig, checker: Arc<dyn FileChecker>) -> DirectoryScanner {
        DirectoryScanner::new(config, checker).unwrap()
    }

    #[test]
    fn test_hello_world_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("f1.txt", "hello"), ("f2.txt", "hello"), ("f3.txt", "world")],
        );

        let registry = Arc::new(DuplicateRegistry::new());
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        scanner.scan(dir.path()).unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.skipped, 0);

        let root = std::fs::canonicalize(dir.path()).unwrap();
        let groups = registry.duplicate_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].files(),
            vec![
                root.join("f1.txt").to_string_lossy().into_owned(),
                root.join("f2.txt").to_string_lossy().into_owned(),
            ]
        );
        let f3 = root.join("f3.txt").to_string_lossy().into_owned();
        assert!(!groups[0].has_file(&f3));
    }

    #[test]
    fn test_counts_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, &str)> = (0..10)
            .map(|i| (format!("file{}.txt", i), "test content"))
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        write_files(dir.path(), &refs);
        write_files(dir.path(), &[("subdir/subfile.txt", "sub content")]);

        let checker = Arc::new(MockChecker::default());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());
        scanner.scan(dir.path()).unwrap();

        assert_eq!(checker.digests.load(Ordering::SeqCst), 11);
        let stats = scanner.stats();
        assert_eq!(stats.files, 11);
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_rescan_same_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "x"), ("sub/b.txt", "x")]);

        let checker = Arc::new(MockChecker::default());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());
        scanner.scan(dir.path()).unwrap();
        let first = scanner.stats();

        // Same directory spelled differently
        scanner.scan(dir.path().join("sub").join("..")).unwrap();
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.stats(), first);
        assert_eq!(checker.digests.load(Ordering::SeqCst), 2);
        assert!(scanner.is_scanned(dir.path()));
    }

    #[test]
    fn test_unresolvable_root() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Arc::new(MockChecker::default());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        let err = scanner.scan(dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::PathResolution);
        assert_eq!(scanner.stats(), ScanStats::default());
        assert_eq!(checker.digests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("a.txt", "1"), ("b.txt", "2"), ("c.txt", "3"), ("d.txt", "4")],
        );

        let checker = Arc::new(MockChecker::failing_on("b.txt"));
        let scanner = scanner_with(ScanConfig::default(), checker.clone());
        let err = scanner.scan(dir.path()).unwrap_err();

        assert!(err.is_file_check());
        let stats = scanner.stats();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.directories, 1);
        assert_eq!(checker.digests.load(Ordering::SeqCst), 2);
        assert_eq!(checker.registered_names(), vec!["a.txt"]);
        assert!(!scanner.is_scanned(dir.path()));
    }

    #[test]
    fn test_fail_fast_every_check_failing() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("file1.txt", "x"), ("file2.txt", "x")]);

        let checker = Arc::new(MockChecker::failing_all());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        assert!(scanner.scan(dir.path()).is_err());
        assert_eq!(checker.digests.load(Ordering::SeqCst), 1);
        assert_eq!(scanner.stats().files, 1);
        assert_eq!(scanner.stats().errors, 1);
    }

    #[test]
    fn test_failed_root_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "1")]);

        let checker = Arc::new(MockChecker::failing_all());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        assert!(scanner.scan(dir.path()).is_err());
        assert!(scanner.scan(dir.path()).is_err());
        assert_eq!(scanner.stats().errors, 2);
    }

    #[test]
    fn test_resilient_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("a.txt", "1"), ("b.txt", "2"), ("c.txt", "3"), ("d.txt", "4")],
        );

        let checker = Arc::new(MockChecker::failing_on("b.txt"));
        let config = ScanConfig::builder()
            .error_policy(ErrorPolicy::Resilient)
            .build();
        let scanner = scanner_with(config, checker.clone());
        scanner.scan(dir.path()).unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.files, 4);
        assert_eq!(stats.errors, 1);
        assert_eq!(checker.registered_names(), vec!["a.txt", "c.txt", "d.txt"]);
        assert!(scanner.is_scanned(dir.path()));
    }

    #[test]
    fn test_empty_files_grouped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("e1", ""), ("e2", ""), ("full", "data")]);

        let registry = Arc::new(DuplicateRegistry::new());
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.stats().files, 3);
        assert_eq!(scanner.stats().skipped, 0);
        assert_eq!(registry.duplicate_groups().len(), 1);
    }

    #[test]
    fn test_skip_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("e1", ""), ("e2", ""), ("full", "data")]);

        let registry = Arc::new(DuplicateRegistry::new());
        let config = ScanConfig::builder().skip_empty(true).build();
        let scanner = scanner_with(config, registry.clone());
        scanner.scan(dir.path()).unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(registry.groups_count(), 1);
        assert!(registry.duplicate_groups().is_empty());
    }

    #[test]
    fn test_root_can_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("only.txt", "x")]);

        let checker = Arc::new(MockChecker::default());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());
        scanner.scan(dir.path().join("only.txt")).unwrap();

        assert_eq!(scanner.stats().files, 1);
        assert_eq!(scanner.stats().directories, 0);
    }

    #[test]
    fn test_overlapping_roots_keep_membership_unique() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("a.txt", "same"), ("nested/b.txt", "same")],
        );

        let registry = Arc::new(DuplicateRegistry::new());
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        scanner.scan(dir.path()).unwrap();
        scanner.scan(dir.path().join("nested")).unwrap();

        let groups = registry.duplicate_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files_count(), 2);
        assert_eq!(scanner.stats().files, 3);
    }

    #[test]
    fn test_scan_all_in_supplied_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_files(first.path(), &[("z.txt", "dup")]);
        write_files(second.path(), &[("a.txt", "dup")]);

        let registry = Arc::new(DuplicateRegistry::new());
        let config = ScanConfig::builder()
            .roots(vec![first.path().to_path_buf(), second.path().to_path_buf()])
            .build();
        let scanner = scanner_with(config, registry.clone());
        scanner.scan_all().unwrap();

        let files = registry.duplicate_groups()[0].files();
        assert!(files[0].ends_with("z.txt"));
        assert!(files[1].ends_with("a.txt"));
        assert_eq!(scanner.stats().directories, 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, String)> = (0..40)
            .map(|i| (format!("d{}/f{:02}.bin", i % 3, i), format!("content-{}", i % 7)))
            .collect();
        let refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        write_files(dir.path(), &refs);

        let sequential = Arc::new(DuplicateRegistry::new());
        let seq_scanner = scanner_with(ScanConfig::default(), sequential.clone());
        seq_scanner.scan(dir.path()).unwrap();

        let parallel = Arc::new(DuplicateRegistry::new());
        let config = ScanConfig::builder().num_threads(4).batch_size(5).build();
        let par_scanner = scanner_with(config, parallel.clone());
        par_scanner.scan(dir.path()).unwrap();

        assert_eq!(seq_scanner.stats(), par_scanner.stats());
        assert_eq!(sequential.duplicate_sets(), parallel.duplicate_sets());
        assert_eq!(parallel.duplicate_sets().len(), 7);
    }

    #[test]
    fn test_parallel_fail_fast_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, &str)> = (0..12).map(|i| (format!("f{:02}", i), "x")).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        write_files(dir.path(), &refs);

        let checker = Arc::new(MockChecker::failing_on("f05"));
        let config = ScanConfig::builder().num_threads(4).batch_size(4).build();
        let scanner = scanner_with(config, checker.clone());

        assert!(scanner.scan(dir.path()).is_err());
        let stats = scanner.stats();
        assert_eq!(stats.files, 6);
        assert_eq!(stats.errors, 1);
        assert_eq!(
            checker.registered_names(),
            vec!["f00", "f01", "f02", "f03", "f04"]
        );
    }

    #[test]
    fn test_concurrent_scans_walk_root_once() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, &str)> = (0..50).map(|i| (format!("f{}", i), "x")).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        write_files(dir.path(), &refs);

        let checker = Arc::new(MockChecker::default());
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| scanner.scan(dir.path()).unwrap());
            }
        });

        assert_eq!(scanner.stats().files, 50);
        assert_eq!(scanner.stats().directories, 1);
        assert_eq!(checker.digests.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_concurrent_scan_waits_for_running_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a", "1"), ("b", "2"), ("c", "3")]);

        let checker = Arc::new(MockChecker::slow(Duration::from_millis(100), false));
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        thread::scope(|s| {
            s.spawn(|| scanner.scan(dir.path()).unwrap());
            thread::sleep(Duration::from_millis(50));
            let waiter = s.spawn(|| {
                scanner.scan(dir.path()).unwrap();
                scanner.is_scanned(dir.path())
            });
            assert!(waiter.join().unwrap());
        });

        assert_eq!(checker.digests.load(Ordering::SeqCst), 3);
        assert_eq!(scanner.stats().files, 3);
    }

    #[test]
    fn test_concurrent_scan_retries_after_failed_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a", "1")]);

        let checker = Arc::new(MockChecker::slow(Duration::from_millis(300), true));
        let scanner = scanner_with(ScanConfig::default(), checker.clone());

        let (first, second) = thread::scope(|s| {
            let first = s.spawn(|| scanner.scan(dir.path()));
            thread::sleep(Duration::from_millis(50));
            let second = s.spawn(|| scanner.scan(dir.path()));
            (first.join().unwrap(), second.join().unwrap())
        });

        assert!(first.unwrap_err().is_file_check());
        assert!(second.unwrap_err().is_file_check());
        assert!(!scanner.is_scanned(dir.path()));
        assert_eq!(checker.digests.load(Ordering::SeqCst), 2);
        assert_eq!(scanner.stats().errors, 2);
    }

    #[test]
    fn test_scan_uses_registry_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "hello"), ("b.txt", "hello")]);

        let registry = Arc::new(DuplicateRegistry::with_algorithm(HashAlgorithm::Md5));
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.algorithm(), HashAlgorithm::Md5);
        let sets = registry.duplicate_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].digest.as_str(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_progress_output_does_not_change_counts() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a", "1"), ("b", "2"), ("c", "3")]);

        let config = ScanConfig::builder()
            .progress_interval(1)
            .show_progress(true)
            .build();
        let scanner = scanner_with(config, Arc::new(MockChecker::default()));
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.stats().files, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "1"), ("c.txt", "3")]);
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("b_link")).unwrap();

        let registry = Arc::new(DuplicateRegistry::new());
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        let err = scanner.scan(dir.path()).unwrap_err();

        assert_eq!(err.kind, ScanErrorKind::FileCheck);
        let stats = scanner.stats();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.files, 2);
        assert_eq!(registry.groups_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_error_fails_fast_without_counting() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "1")]);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let config = ScanConfig::builder().follow_links(true).build();
        let scanner = scanner_with(config, Arc::new(MockChecker::default()));
        let err = scanner.scan(dir.path()).unwrap_err();

        assert_eq!(err.kind, ScanErrorKind::Walk);
        assert_eq!(scanner.stats().files, 1);
        assert_eq!(scanner.stats().errors, 0);
        assert!(!scanner.is_scanned(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_error_counted_when_resilient() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "1")]);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let config = ScanConfig::builder()
            .follow_links(true)
            .error_policy(ErrorPolicy::Resilient)
            .build();
        let scanner = scanner_with(config, Arc::new(MockChecker::default()));
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.stats().files, 1);
        assert_eq!(scanner.stats().errors, 1);
        assert!(scanner.is_scanned(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_to_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("real/a.txt", "1")]);
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let scanner = scanner_with(ScanConfig::default(), Arc::new(MockChecker::default()));
        scanner.scan(dir.path()).unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.directories, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_file_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.txt", "same")]);
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("b_link")).unwrap();

        let registry = Arc::new(DuplicateRegistry::new());
        let scanner = scanner_with(ScanConfig::default(), registry.clone());
        scanner.scan(dir.path()).unwrap();

        assert_eq!(scanner.stats().files, 2);
        assert_eq!(registry.duplicate_groups().len(), 1);
    }

    const ALPHABET: [&str; 3] = ["a", "bb", "ccc"];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_equal_contents_form_one_group(contents in prop::collection::vec(0..ALPHABET.len(), 1..12)) {
            let dir = tempfile::tempdir().unwrap();
            let files: Vec<(String, &str)> = contents
                .iter()
                .enumerate()
                .map(|(i, &c)| (format!("f{:02}", i), ALPHABET[c]))
                .collect();
            let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
            write_files(dir.path(), &refs);

            let registry = Arc::new(DuplicateRegistry::new());
            let scanner = scanner_with(ScanConfig::default(), registry.clone());
            scanner.scan(dir.path()).unwrap();

            let root = std::fs::canonicalize(dir.path()).unwrap();
            let content_of = |file: &str| {
                let name = Path::new(file).file_name().unwrap().to_string_lossy().into_owned();
                files.iter().find(|(n, _)| *n == name).map(|(_, c)| *c).unwrap()
            };

            let groups = registry.duplicate_groups();
            for group in &groups {
                let first = content_of(&group.files()[0]);
                prop_assert!(group.files().iter().all(|f| content_of(f) == first));
            }

            for content in ALPHABET {
                let expected: Vec<String> = files
                    .iter()
                    .filter(|(_, c)| *c == content)
                    .map(|(n, _)| root.join(n).to_string_lossy().into_owned())
                    .collect();
                if expected.len() < 2 {
                    continue;
                }
                let digest = DigestComputer::default().compute_reader(content.as_bytes()).unwrap();
                let matching: Vec<_> = groups.iter().filter(|g| g.has_file(&expected[0])).collect();
                prop_assert_eq!(matching.len(), 1);
                prop_assert_eq!(matching[0].digest(), &digest);
                prop_assert_eq!(matching[0].files(), expected);
            }
        }
    }
}
