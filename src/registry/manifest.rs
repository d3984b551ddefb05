//! Persistent manifest: on-disk snapshot of content hashes keyed by path.
//!
//! The manifest lets a restarted process skip rehashing files whose mtime
//! has not moved. Entries are only trusted when the stored mtime matches the
//! live one.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

/// A single manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub mtime: u64,
    pub hash: String,
}

/// Manifest contents, keyed by lowercased root-relative path.
pub type Manifest = FxHashMap<String, ManifestEntry>;

/// Load the manifest from disk.
///
/// A missing or corrupt manifest is treated as empty, never as an error;
/// the worst case is a full rehash.
pub fn load(path: &Path) -> Manifest {
    let Ok(json) = std::fs::read_to_string(path) else {
        return Manifest::default();
    };
    match serde_json::from_str(&json) {
        Ok(manifest) => manifest,
        Err(e) => {
            crate::debug!("manifest"; "ignoring corrupt manifest {}: {}", path.display(), e);
            Manifest::default()
        }
    }
}

/// Write the manifest atomically (temp file + rename in the same directory).
pub fn store(path: &Path, manifest: &Manifest) -> Result<(), PipelineError> {
    let json = serde_json::to_string(manifest).map_err(|e| PipelineError::ManifestWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| PipelineError::ManifestWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
