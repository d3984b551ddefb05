//! Asset registry: discovered source files and tracked generated artifacts.
//!
//! A path belongs to exactly one of the two maps: either it is a source file
//! (keyed case-insensitively) or a previously generated artifact grouped
//! under its canonical name so stale generations can be pruned.

pub mod manifest;
pub mod scan;

use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::PipelineError;
use crate::naming;

use manifest::ManifestEntry;
use scan::mtime_millis;

/// A discoverable source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Root-relative path with original casing and `/` separators.
    pub name: String,
    /// Modification time in epoch milliseconds.
    pub mtime: u64,
    /// Content digest; empty until `rehash` (or a watcher upsert) fills it.
    pub hash: String,
}

/// In-memory index of the asset root.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    root: PathBuf,
    /// Lowercased relative path → source file.
    sources: FxHashMap<String, SourceFile>,
    /// Canonical generated path → every tracked generation of it on disk.
    generated: FxHashMap<String, Vec<String>>,
}

impl AssetRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: FxHashMap::default(),
            generated: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root directory and rebuild both maps.
    ///
    /// Generated artifacts (matching `<prefix>-<hex>-<name>`) are grouped by
    /// canonical name; the manifest file is excluded; everything else is a
    /// source file. A missing or unreadable root is an error and leaves the
    /// registry unpopulated.
    pub fn reindex(&mut self, config: &Config) -> Result<(), PipelineError> {
        let files = scan::walk_directory(&self.root)
            .map_err(|e| PipelineError::Discovery(e.to_string()))?;

        self.sources.clear();
        self.generated.clear();

        for file in files {
            if naming::is_generated(&config.asset_prefix, &file.name) {
                if let Some(canonical) = naming::canonical_path(&config.asset_prefix, &file.name) {
                    // Keyed case-insensitively, like source files
                    self.generated
                        .entry(canonical.to_lowercase())
                        .or_default()
                        .push(file.name);
                }
            } else if file.name != config.manifest {
                self.sources.insert(
                    file.name.to_lowercase(),
                    SourceFile {
                        name: file.name,
                        mtime: file.mtime,
                        hash: String::new(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Fill in content hashes, reusing the persistent manifest where mtimes
    /// still match.
    ///
    /// Returns whether any file actually had to be rehashed. When it did,
    /// the manifest is rewritten; a write failure is reported but does not
    /// abort the caller since the in-memory registry remains valid.
    pub fn rehash(&mut self, config: &Config) -> bool {
        let manifest_path = self.root.join(&config.manifest);
        let manifest = manifest::load(&manifest_path);
        let mut outdated = false;

        for (key, file) in &mut self.sources {
            if let Some(entry) = manifest.get(key)
                && entry.mtime == file.mtime
            {
                file.hash = entry.hash.clone();
                continue;
            }
            crate::debug!("index"; "hashing file {}", file.name);
            match config.hash.hash_file(&self.root.join(&file.name)) {
                Ok(hash) => file.hash = hash,
                Err(e) => {
                    crate::log!("error"; "failed to hash {}: {}", file.name, e);
                    continue;
                }
            }
            outdated = true;
        }

        if outdated
            && let Err(e) = self.write_manifest(config)
        {
            crate::log!("error"; "{}", e);
        }
        outdated
    }

    /// Persist the current hashes to the manifest file.
    pub fn write_manifest(&self, config: &Config) -> Result<(), PipelineError> {
        let entries = self
            .sources
            .iter()
            .map(|(key, file)| {
                (
                    key.clone(),
                    ManifestEntry {
                        mtime: file.mtime,
                        hash: file.hash.clone(),
                    },
                )
            })
            .collect();
        manifest::store(&self.root.join(&config.manifest), &entries)
    }

    /// Look up a source file by lowercased relative path.
    pub fn get(&self, key: &str) -> Option<&SourceFile> {
        self.sources.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }

    /// Iterate over the lowercased source keys.
    pub fn source_keys(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Stat and rehash a single file, inserting or replacing its entry.
    /// Used by the hot-reload watcher.
    pub fn upsert(&mut self, rel: &str, config: &Config) -> io::Result<()> {
        let path = self.root.join(rel);
        let metadata = std::fs::metadata(&path)?;
        let hash = config.hash.hash_file(&path)?;
        self.sources.insert(
            rel.to_lowercase(),
            SourceFile {
                name: rel.to_string(),
                mtime: mtime_millis(&metadata),
                hash,
            },
        );
        Ok(())
    }

    /// Drop a source file entry (watcher-detected deletion).
    pub fn remove(&mut self, rel: &str) {
        self.sources.remove(&rel.to_lowercase());
    }

    /// Record a generated artifact under its canonical name.
    pub fn track_generated(&mut self, canonical: &str, filename: &str) {
        let tracked = self.generated.entry(canonical.to_string()).or_default();
        if !tracked.iter().any(|f| f == filename) {
            tracked.push(filename.to_string());
        }
    }

    /// Tracked generations for a canonical name.
    pub fn generated_for(&self, canonical: &str) -> Option<&[String]> {
        self.generated.get(canonical).map(Vec::as_slice)
    }

    /// Drop every tracked generation of `canonical` except `keep`,
    /// returning the filenames that were removed from tracking.
    pub fn prune_generated(&mut self, canonical: &str, keep: &str) -> Vec<String> {
        let Some(tracked) = self.generated.get_mut(canonical) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        tracked.retain(|file| {
            if file == keep {
                true
            } else {
                removed.push(file.clone());
                false
            }
        });
        removed
    }

    /// Absolute paths of every directory currently containing a source file.
    /// These are the roots the hot-reload watcher attaches to.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<&str> = self
            .sources
            .values()
            .map(|file| naming::dirname(&file.name))
            .collect();
        dirs.sort_unstable();
        dirs.dedup();
        dirs.into_iter().map(|dir| self.root.join(dir)).collect()
    }
}
