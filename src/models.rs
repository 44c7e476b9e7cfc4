//! Core data models for the files checker

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash function used to compute content digests
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 64 hex characters
    #[default]
    Sha256,
    /// MD5, 32 hex characters
    Md5,
}

impl HashAlgorithm {
    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Md5 => 32,
        }
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase hex content digest of a whole file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap an already hex-encoded digest
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time copy of the scan counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files submitted for hashing
    pub files: u64,
    /// Directories visited
    pub directories: u64,
    /// File check and walk failures
    pub errors: u64,
    /// Entries excluded from hashing (empty files, special files)
    pub skipped: u64,
}

impl ScanStats {
    /// Check if no errors were counted
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

/// Serializable view of one duplicate group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    /// Shared content digest
    pub digest: Digest,
    /// Longest common directory prefix of the member paths
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub location: String,
    /// Member paths in discovery order
    pub files: Vec<String>,
}
