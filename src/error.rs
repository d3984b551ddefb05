//! Pipeline error types.
//!
//! Every public operation returns `Result<T, PipelineError>`. Variants carry
//! plain strings rather than source errors so a single build failure can be
//! cloned and fanned out to every caller waiting on the same output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the asset pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The asset root directory is missing or unreadable.
    #[error("failed to locate assets: {0}")]
    Discovery(String),

    /// The manifest file could not be persisted (in-memory state is intact).
    #[error("failed to write the asset manifest to `{path}`: {reason}")]
    ManifestWrite { path: PathBuf, reason: String },

    /// An asset named in a resolution could not be found.
    #[error("{}", not_found_message(.identifier, .bundle.as_deref(), .tried))]
    NotFound {
        identifier: String,
        /// The enclosing bundle, when the asset came from an `include` list.
        bundle: Option<String>,
        /// Alternate compiler-input names that were probed but missing.
        tried: Vec<String>,
    },

    /// A glob pattern in an include/dependency list matched nothing.
    #[error("no assets matched the pattern \"{pattern}\"{}", bundle.as_deref().map(|b| format!(" when building asset \"{b}\"")).unwrap_or_default())]
    UnmatchedGlob {
        pattern: String,
        bundle: Option<String>,
    },

    /// A declared dependency could not be located.
    #[error("failed to locate \"{name}\" when finding dependencies for \"{bundle}\"")]
    MissingDependency { name: String, bundle: String },

    /// A resolution produced no member files.
    #[error("no assets were defined")]
    EmptyBundle,

    /// A source file could not be read during a build.
    #[error("failed to read file \"{file}\": {reason}")]
    Read { file: String, reason: String },

    /// A compiler adapter failed.
    #[error("failed to compile file \"{file}\": {reason}")]
    Compile { file: String, reason: String },

    /// A compressor adapter failed.
    #[error("failed to compress asset \"{output}\": {reason}")]
    Compress { output: String, reason: String },

    /// A synchronous build selected an async-only adapter.
    #[error("the {extension} adapter is async-only and cannot be used for inline delivery")]
    AsyncAdapter { extension: String },

    /// No tag formatter is registered for an output extension.
    #[error("unable to create an HTML tag for type \"{extension}\"")]
    UnknownTagFormat { extension: String },

    /// Filesystem failure while writing a build output.
    #[error("failed to write asset `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
}

fn not_found_message(identifier: &str, bundle: Option<&str>, tried: &[String]) -> String {
    let mut message = format!("Asset \"{identifier}\" could not be found");
    if let Some(bundle) = bundle {
        message.push_str(&format!(" when building asset \"{bundle}\""));
    }
    if !tried.is_empty() {
        message.push_str(&format!(" (tried \"{}\")", tried.join("\", \"")));
    }
    message
}
