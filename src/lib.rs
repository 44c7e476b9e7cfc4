//! Content-based duplicate file detection
//!
//! This library walks directory trees, digests every file and groups paths
//! that share a digest. The registry and the counters are safe to share
//! between threads; each canonical scan root is walked at most once.
//!
//! ```no_run
//! use std::sync::Arc;
//! use files_checker::{DirectoryScanner, DuplicateRegistry, ScanConfig};
//!
//! let registry = Arc::new(DuplicateRegistry::new());
//! let scanner = DirectoryScanner::new(ScanConfig::default(), registry.clone()).unwrap();
//! scanner.scan("/data").unwrap();
//! for group in registry.duplicate_groups() {
//!     println!("{}: {:?}", group.digest(), group.files());
//! }
//! ```

pub mod config;
pub mod error;
pub mod hasher;
pub mod models;
pub mod progress;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod summary;

pub use config::{ErrorPolicy, ScanConfig};
pub use error::{ScanError, ScanErrorKind};
pub use hasher::DigestComputer;
pub use models::{Digest, DuplicateSet, HashAlgorithm, ScanStats};
pub use progress::{
    DoneMessage, ErrorProgressMessage, ProgressMessage, ProgressReporter, StartMessage,
};
pub use registry::{DuplicateGroup, DuplicateRegistry, FileChecker};
pub use report::{render_groups, render_summary, ScanReport};
pub use scanner::DirectoryScanner;
pub use summary::ScanSummary;
