//! Error types for the files checker

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error kinds that can occur during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// The scan root could not be canonicalized
    PathResolution,
    /// The tree traversal itself failed (e.g. unreadable directory)
    Walk,
    /// Reading or hashing a single file failed
    FileCheck,
    /// The hashing thread pool could not be created
    ThreadPool,
}

impl ScanErrorKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorKind::PathResolution => "path_resolution",
            ScanErrorKind::Walk => "walk",
            ScanErrorKind::FileCheck => "file_check",
            ScanErrorKind::ThreadPool => "thread_pool",
        }
    }
}

/// Represents an error that occurred during scanning
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// The root could not be resolved to a canonical absolute path
    pub fn path_resolution(path: &Path, err: &std::io::Error) -> Self {
        Self::new(
            ScanErrorKind::PathResolution,
            Some(path.to_path_buf()),
            format!("failed to resolve path: {}", err),
        )
    }

    /// Create a traversal error from a walkdir failure
    pub fn walk(err: &walkdir::Error) -> Self {
        Self::new(
            ScanErrorKind::Walk,
            err.path().map(Path::to_path_buf),
            format!("failed to scan directory: {}", err),
        )
    }

    /// Create a file check error
    pub fn file_check(path: &Path, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::FileCheck, Some(path.to_path_buf()), message)
    }

    /// Create a thread pool error
    pub fn thread_pool(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::ThreadPool, None, message)
    }

    /// Whether this error came from digesting a single file
    pub fn is_file_check(&self) -> bool {
        self.kind == ScanErrorKind::FileCheck
    }
}

impl From<rayon::ThreadPoolBuildError> for ScanError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::thread_pool(err.to_string())
    }
}
