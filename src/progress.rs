//! Progress reporting module for scan operations
//!
//! This module provides data structures and utilities for reporting
//! scan progress to external callers via stderr. Messages are newline
//! delimited JSON objects tagged by `_t`.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::ErrorPolicy;
use crate::error::ScanError;
use crate::models::{HashAlgorithm, ScanStats};

/// Start message sent when the walk of a root begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Canonical root path
    pub root: String,
    /// Hash algorithm in use
    pub algorithm: &'static str,
    /// Whether the walk continues past failures
    pub resilient: bool,
}

impl StartMessage {
    /// Create a new start message
    pub fn new(seq: u64, ts: u64, root: String, algorithm: &'static str, resilient: bool) -> Self {
        Self {
            msg_type: "start",
            seq,
            ts,
            root,
            algorithm,
            resilient,
        }
    }
}

/// Progress message sent every configured number of files
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Number of files processed
    #[serde(rename = "f")]
    pub files: u64,
    /// Number of directories visited
    #[serde(rename = "d")]
    pub dirs: u64,
    /// Number of errors counted
    #[serde(rename = "e")]
    pub errors: u64,
    /// Number of skipped entries
    #[serde(rename = "s")]
    pub skipped: u64,
    /// Root being walked
    pub root: String,
    /// Milliseconds since the walk of `root` started
    pub ms: u64,
}

impl ProgressMessage {
    /// Create a new progress message
    pub fn new(seq: u64, ts: u64, stats: ScanStats, root: String, ms: u64) -> Self {
        Self {
            msg_type: "p",
            seq,
            ts,
            files: stats.files,
            dirs: stats.directories,
            errors: stats.errors,
            skipped: stats.skipped,
            root,
            ms,
        }
    }
}

/// Error message sent when an error occurs during scan
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProgressMessage {
    /// Message type identifier ("err" for error)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Error type/category
    pub error_type: String,
    /// Error message description
    pub message: String,
    /// Path that caused the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorProgressMessage {
    /// Create a new error progress message
    pub fn new(
        seq: u64,
        ts: u64,
        error_type: String,
        message: String,
        path: Option<String>,
    ) -> Self {
        Self {
            msg_type: "err",
            seq,
            ts,
            error_type,
            message,
            path,
        }
    }
}

/// Done message sent when the walk of a root completes
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage {
    /// Message type identifier ("done" for completion)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Root that was walked
    pub root: String,
    /// Total number of files processed
    #[serde(rename = "tf")]
    pub total_files: u64,
    /// Total number of directories visited
    #[serde(rename = "td")]
    pub total_dirs: u64,
    /// Number of errors counted
    #[serde(rename = "ec")]
    pub error_count: u64,
    /// Number of skipped entries
    #[serde(rename = "sk")]
    pub skipped: u64,
    /// Walk duration in milliseconds
    pub ms: u64,
}

impl DoneMessage {
    /// Create a new done message
    pub fn new(seq: u64, ts: u64, root: String, stats: ScanStats, ms: u64) -> Self {
        Self {
            msg_type: "done",
            seq,
            ts,
            root,
            total_files: stats.files,
            total_dirs: stats.directories,
            error_count: stats.errors,
            skipped: stats.skipped,
            ms,
        }
    }
}

/// Progress reporter for outputting scan progress to stderr
///
/// Output is purely observational: nothing the reporter does feeds back into
/// the counters or the walk.
#[derive(Debug)]
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Sequence number for messages
    seq: AtomicU64,
    /// Start time of the reporter
    start_time: Instant,
}

impl ProgressReporter {
    /// Create a new ProgressReporter
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seq: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get the next sequence number (monotonically increasing)
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current timestamp in milliseconds since reporter creation
    pub fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Output a serializable message to stderr as JSON
    pub fn output_to_stderr<T: Serialize>(&self, msg: &T) {
        if let Ok(json) = serde_json::to_string(msg) {
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "{}", json).ok();
            stderr.flush().ok();
        }
    }

    /// Report the start of a root walk
    pub fn report_start(&self, root: &Path, algorithm: HashAlgorithm, policy: ErrorPolicy) {
        if !self.enabled {
            return;
        }

        let msg = StartMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            root.to_string_lossy().to_string(),
            algorithm.as_str(),
            policy == ErrorPolicy::Resilient,
        );

        self.output_to_stderr(&msg);
    }

    /// Report scan progress
    pub fn report_progress(&self, root: &Path, stats: ScanStats, ms: u64) {
        if !self.enabled {
            return;
        }

        let msg = ProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            stats,
            root.to_string_lossy().to_string(),
            ms,
        );

        self.output_to_stderr(&msg);
    }

    /// Report an error during scan
    pub fn report_error(&self, error: &ScanError) {
        if !self.enabled {
            return;
        }

        let msg = ErrorProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            error.kind.as_str().to_string(),
            error.message.clone(),
            error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        );

        self.output_to_stderr(&msg);
    }

    /// Report completion of a root walk
    pub fn report_done(&self, root: &Path, stats: ScanStats, ms: u64) {
        if !self.enabled {
            return;
        }

        let msg = DoneMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            root.to_string_lossy().to_string(),
            stats,
            ms,
        );

        self.output_to_stderr(&msg);
    }

    /// Check if the reporter is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
