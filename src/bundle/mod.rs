//! Bundle definitions: a resolved logical identifier and its member files.

mod resolve;

pub use resolve::{Resolution, expand_globs, normalize_identifier, resolve};

use crate::config::BundleOptions;
use crate::registry::SourceFile;

/// A resolved bundle for a logical identifier.
///
/// Member files are snapshots taken at resolution time; a definition is not
/// invalidated when the underlying registry changes. Re-resolving the
/// identifier produces a fresh definition with current hashes.
#[derive(Debug, Clone)]
pub struct BundleDefinition {
    /// Normalized identifier (lowercased, compiler extensions rewritten),
    /// e.g. `js/all.js`. Doubles as the canonical output path.
    pub identifier: String,
    /// Content files in bundle order (declaration order, first occurrence
    /// kept on duplicates).
    pub files: Vec<SourceFile>,
    /// Files contributing to the bundle hash but not its contents.
    pub dependencies: Vec<SourceFile>,
    /// Options the definition was resolved under.
    pub options: BundleOptions,
    /// On-disk filename relative to the asset root,
    /// e.g. `js/asset-b5d5d67465f661c1-all.js`.
    pub filename: String,
    /// Served path (filename under the serve prefix).
    pub output_path: String,
}
