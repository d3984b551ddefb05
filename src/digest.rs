//! Content digests for cache-busting filenames.
//!
//! The digest algorithm is configurable: md5 is the default for its short,
//! stable hex output (these hashes address caches, they are not integrity
//! checks), sha1 and blake3 are drop-in alternatives.

use md5::{Digest as _, Md5};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha1,
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha1 => write!(f, "sha1"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl HashAlgorithm {
    /// Hash a byte buffer, returning the lowercase hex digest.
    pub fn hash_bytes(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Sha1 => hex::encode(sha1::Sha1::digest(bytes)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        }
    }

    /// Hash the contents of a file.
    pub fn hash_file(&self, path: &Path) -> io::Result<String> {
        Ok(self.hash_bytes(&fs::read(path)?))
    }
}
