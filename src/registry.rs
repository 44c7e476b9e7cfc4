//! Content-addressed registry of duplicate groups
//!
//! The registry maps a digest to the group of paths that produced it. Two
//! levels of locking keep unrelated digests from contending:
//!
//! - the digest map is behind one `RwLock`, taken only to look up or insert a
//!   group and never while a file is being read;
//! - every [`DuplicateGroup`] guards its own path list.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ScanError;
use crate::hasher::DigestComputer;
use crate::models::{Digest, DuplicateSet, HashAlgorithm};

/// Anything that can digest a file and remember where it was seen.
///
/// [`DirectoryScanner`](crate::scanner::DirectoryScanner) only talks to this
/// trait, so tests can substitute a checker that fails on demand.
pub trait FileChecker: Send + Sync {
    /// Compute the content digest of `path` without recording it
    fn digest(&self, path: &Path) -> Result<Digest, ScanError>;

    /// Record `path` under an already computed digest
    fn register(&self, path: &Path, digest: &Digest);

    /// Hash function behind [`FileChecker::digest`]
    fn algorithm(&self) -> HashAlgorithm;

    /// Digest `path` and record it
    fn check(&self, path: &Path) -> Result<Digest, ScanError> {
        let digest = self.digest(path)?;
        self.register(path, &digest);
        Ok(digest)
    }
}

#[derive(Debug, Default)]
struct GroupFiles {
    ordered: Vec<String>,
    members: HashSet<String>,
}

/// The distinct paths sharing one content digest, in discovery order
#[derive(Debug)]
pub struct DuplicateGroup {
    digest: Digest,
    files: RwLock<GroupFiles>,
}

impl DuplicateGroup {
    /// Create a group holding a single path
    pub fn new(digest: Digest, path: impl Into<String>) -> Self {
        let group = Self {
            digest,
            files: RwLock::new(GroupFiles::default()),
        };
        group.add(path);
        group
    }

    /// The digest shared by every member
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Append `path` unless it is already a member (exact string match)
    pub fn add(&self, path: impl Into<String>) {
        let path = path.into();
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        if files.members.insert(path.clone()) {
            files.ordered.push(path);
        }
    }

    /// Check whether `path` is a member
    pub fn has_file(&self, path: &str) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .members
            .contains(path)
    }

    /// Copy of the member paths in discovery order
    pub fn files(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }

    /// Number of member paths
    pub fn files_count(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    /// A group is a duplicate once it holds two or more paths
    pub fn has_multiple_files(&self) -> bool {
        self.files_count() > 1
    }

    /// Longest common directory prefix of the member paths.
    ///
    /// Always ends with a separator, or is empty when the members share no
    /// directory component.
    pub fn common_path_prefix(&self) -> String {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let mut iter = files.ordered.iter();
        let Some(first) = iter.next() else {
            return String::new();
        };

        let mut prefix: &str = first;
        for path in iter {
            prefix = common_prefix(prefix, path);
        }
        directory_part(prefix).to_string()
    }

    /// Serializable snapshot of the group
    pub fn to_set(&self) -> DuplicateSet {
        DuplicateSet {
            digest: self.digest.clone(),
            location: self.common_path_prefix(),
            files: self.files(),
        }
    }
}

/// Character-wise longest common prefix, as a slice of `a`
fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// Everything up to and including the last separator
fn directory_part(path: &str) -> &str {
    match path.rfind(std::path::is_separator) {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Maps digests to groups for one checking session
#[derive(Debug, Default)]
pub struct DuplicateRegistry {
    computer: DigestComputer,
    groups: RwLock<HashMap<Digest, Arc<DuplicateGroup>>>,
}

impl DuplicateRegistry {
    /// Create an empty registry hashing with SHA-256
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry hashing with `algorithm`
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            computer: DigestComputer::new(algorithm),
            groups: RwLock::default(),
        }
    }

    /// Look up the group for `digest`
    pub fn group(&self, digest: &Digest) -> Option<Arc<DuplicateGroup>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(digest)
            .cloned()
    }

    /// Number of distinct digests seen
    pub fn groups_count(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every group with at least two members, in unspecified order
    pub fn duplicate_groups(&self) -> Vec<Arc<DuplicateGroup>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|group| group.has_multiple_files())
            .cloned()
            .collect()
    }

    /// Duplicate groups as serializable sets, sorted by digest
    pub fn duplicate_sets(&self) -> Vec<DuplicateSet> {
        let mut sets: Vec<DuplicateSet> = self
            .duplicate_groups()
            .iter()
            .map(|group| group.to_set())
            .collect();
        sets.sort_by(|a, b| a.digest.cmp(&b.digest));
        sets
    }
}

impl FileChecker for DuplicateRegistry {
    fn digest(&self, path: &Path) -> Result<Digest, ScanError> {
        self.computer
            .compute(path)
            .map_err(|e| ScanError::file_check(path, format!("failed to calculate hash: {}", e)))
    }

    fn register(&self, path: &Path, digest: &Digest) {
        let path = path.to_string_lossy().into_owned();

        // Existing digests only need the shared map lock.
        let existing = self.group(digest);
        if let Some(group) = existing {
            group.add(path);
            return;
        }

        let group = {
            let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
            match groups.get(digest) {
                Some(group) => Arc::clone(group),
                None => {
                    groups.insert(
                        digest.clone(),
                        Arc::new(DuplicateGroup::new(digest.clone(), path)),
                    );
                    return;
                }
            }
        };
        group.add(path);
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.computer.algorithm()
    }
}
