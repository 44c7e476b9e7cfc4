//! Text and JSON rendering of scan results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

use crate::models::{DuplicateSet, ScanStats};

/// Machine-readable result of a checking session
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Roots as supplied by the caller
    pub roots: Vec<PathBuf>,
    /// Final counter values
    pub stats: ScanStats,
    /// Duplicate groups sorted by digest
    pub duplicates: Vec<DuplicateSet>,
}

impl ScanReport {
    /// Create a report stamped with the current time
    pub fn new(roots: Vec<PathBuf>, stats: ScanStats, duplicates: Vec<DuplicateSet>) -> Self {
        Self {
            generated_at: Utc::now(),
            roots,
            stats,
            duplicates,
        }
    }

    /// Total number of paths that belong to a duplicate group
    pub fn duplicate_files(&self) -> usize {
        self.duplicates.iter().map(|set| set.files.len()).sum()
    }
}

/// Render duplicate groups, one block per group followed by a blank line.
///
/// Unless `full_paths` is set, member paths are shown relative to the group
/// location, which is printed on its own line.
pub fn render_groups(sets: &[DuplicateSet], full_paths: bool) -> String {
    let mut out = String::new();
    for set in sets {
        let _ = writeln!(out, "{}", set.digest);

        let relative = !full_paths && !set.location.is_empty();
        if relative {
            let _ = writeln!(out, "Location: {}", set.location);
        }

        for file in &set.files {
            let shown = if relative {
                file.strip_prefix(set.location.as_str()).unwrap_or(file.as_str())
            } else {
                file.as_str()
            };
            let _ = writeln!(out, "  {}", shown);
        }
        out.push('\n');
    }
    out
}

/// One-line summary of the counters
pub fn render_summary(stats: &ScanStats) -> String {
    format!(
        "Directories: {}, files: {}, errors: {}, skipped: {}",
        stats.directories, stats.files, stats.errors, stats.skipped
    )
}
