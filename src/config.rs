//! Configuration for the files checker

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of files between progress indicators
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Default number of walk entries hashed together on the thread pool
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// What to do when a file cannot be checked or a directory cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the walk of the current root on the first failure
    #[default]
    FailFast,
    /// Count the failure and continue with the next entry
    Resilient,
}

/// Configuration for the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root paths to scan, in scan order
    pub roots: Vec<PathBuf>,

    /// Count zero-byte files as skipped instead of hashing them
    pub skip_empty: bool,

    /// Failure handling during a walk
    pub error_policy: ErrorPolicy,

    /// Follow symbolic links during traversal
    pub follow_links: bool,

    /// Number of hashing threads
    /// 1 hashes on the calling thread, 0 means auto-detect
    pub num_threads: usize,

    /// Walk entries hashed together when a thread pool is used
    pub batch_size: usize,

    /// Files between progress indicators
    pub progress_interval: u64,

    /// Emit JSON progress messages to stderr
    pub show_progress: bool,

    /// Show absolute paths in the report instead of paths relative to the
    /// group location
    pub full_paths: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            skip_empty: false,
            error_policy: ErrorPolicy::FailFast,
            follow_links: false,
            num_threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            show_progress: false,
            full_paths: false,
        }
    }
}

impl ScanConfig {
    /// Create a new config with the given roots
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// Get the effective number of threads
    pub fn effective_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.num_threads
        }
    }

    /// Whether file digests are computed on a thread pool
    pub fn is_parallel(&self) -> bool {
        self.effective_threads() > 1
    }

    /// Entries buffered before hashing; 1 in sequential mode
    pub fn effective_batch_size(&self) -> usize {
        if self.is_parallel() {
            self.batch_size.max(1)
        } else {
            1
        }
    }

    /// Whether a progress indicator is due after `files` processed files
    pub fn is_progress_due(&self, files: u64) -> bool {
        self.progress_interval > 0 && files % self.progress_interval == 0
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the roots
    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.roots = roots;
        self
    }

    /// Add a root
    pub fn add_root(mut self, root: PathBuf) -> Self {
        self.config.roots.push(root);
        self
    }

    /// Enable or disable skipping of empty files
    pub fn skip_empty(mut self, enabled: bool) -> Self {
        self.config.skip_empty = enabled;
        self
    }

    /// Set the error policy
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    /// Enable or disable following symbolic links
    pub fn follow_links(mut self, enabled: bool) -> Self {
        self.config.follow_links = enabled;
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the progress interval
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Enable or disable JSON progress output
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.config.show_progress = enabled;
        self
    }

    /// Enable or disable absolute paths in the report
    pub fn full_paths(mut self, enabled: bool) -> Self {
        self.config.full_paths = enabled;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}
