//! Scan counters shared across concurrent file processing

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::ScanStats;

/// Monotonic counters for files, directories, errors and skipped entries
#[derive(Debug, Default)]
pub struct ScanSummary {
    files: AtomicU64,
    directories: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
}

impl ScanSummary {
    /// Create a summary with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a processed file, returning the new total
    pub fn add_file(&self) -> u64 {
        self.files.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a visited directory, returning the new total
    pub fn add_directory(&self) -> u64 {
        self.directories.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count an error, returning the new total
    pub fn add_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a skipped entry, returning the new total
    pub fn add_skipped(&self) -> u64 {
        self.skipped.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Files counted so far
    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    /// Directories counted so far
    pub fn directories(&self) -> u64 {
        self.directories.load(Ordering::Relaxed)
    }

    /// Errors counted so far
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Skipped entries counted so far
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Copy the current counter values.
    ///
    /// Each counter is read atomically; the four reads are not taken as one
    /// transaction.
    pub fn snapshot(&self) -> ScanStats {
        ScanStats {
            files: self.files(),
            directories: self.directories(),
            errors: self.errors(),
            skipped: self.skipped(),
        }
    }
}
