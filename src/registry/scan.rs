//! Recursive directory scanning (pure, no registry mutation).

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// A file discovered during a scan: root-relative name and mtime.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Root-relative path with `/` separators.
    pub name: String,
    /// Modification time in milliseconds since the epoch.
    pub mtime: u64,
}

/// Recursively walk `root`, returning every file with its mtime.
///
/// A missing or unreadable root is an error; an empty directory yields an
/// empty list.
pub fn walk_directory(root: &Path) -> io::Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    walk_recursive(root, "", &mut files)?;
    Ok(files)
}

fn walk_recursive(dir: &Path, prefix: &str, files: &mut Vec<ScannedFile>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let rel = if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        };
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            walk_recursive(&entry.path(), &rel, files)?;
        } else {
            files.push(ScannedFile {
                name: rel,
                mtime: mtime_millis(&metadata),
            });
        }
    }
    Ok(())
}

/// Extract an mtime in epoch milliseconds from file metadata.
pub fn mtime_millis(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
