//! Whole-file content digests
//!
//! Files are streamed through the hash function in fixed-size chunks, so
//! memory use does not depend on file size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::{Digest, HashAlgorithm};

/// Read buffer size for streaming file content
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes content digests with a fixed hash algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestComputer {
    algorithm: HashAlgorithm,
}

impl DigestComputer {
    /// Create a computer for the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest the full content of the file at `path`.
    ///
    /// The file handle is dropped on every return path.
    pub fn compute(&self, path: &Path) -> std::io::Result<Digest> {
        let file = File::open(path)?;
        self.compute_reader(file)
    }

    /// Digest everything readable from `reader`
    pub fn compute_reader<R: Read>(&self, reader: R) -> std::io::Result<Digest> {
        match self.algorithm {
            HashAlgorithm::Sha256 => stream_digest::<sha2::Sha256, R>(reader),
            HashAlgorithm::Md5 => stream_digest::<md5::Md5, R>(reader),
        }
    }
}

fn stream_digest<D: sha2::Digest, R: Read>(mut reader: R) -> std::io::Result<Digest>
where
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(Digest::new(format!("{:x}", hasher.finalize())))
}
