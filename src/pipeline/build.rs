//! Bundle assembly: read, compile, concatenate, wrap, compress, write.

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapter::AdapterSet;
use crate::bundle::BundleDefinition;
use crate::config::Config;
use crate::error::PipelineError;
use crate::naming;

/// Build a bundle to its content-addressed output file, returning the
/// absolute path that was written.
pub fn compile_bundle(
    definition: &BundleDefinition,
    root: &Path,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<PathBuf, PipelineError> {
    crate::debug!("build"; "compiling {}", definition.filename);
    let contents = build_contents(definition, root, adapters, config)?;

    let output = root.join(&definition.filename);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::Write {
            path: output.clone(),
            reason: e.to_string(),
        })?;
    }
    fs::write(&output, contents).map_err(|e| PipelineError::Write {
        path: output.clone(),
        reason: e.to_string(),
    })?;
    Ok(output)
}

/// Produce the final bundle contents in memory, compression included.
pub fn build_contents(
    definition: &BundleDefinition,
    root: &Path,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<String, PipelineError> {
    let mut contents = assemble(definition, root, adapters, config)?;
    if config.compress
        && let Some(compressor) = adapters.compressor_for(naming::extname(&definition.identifier))
    {
        let source = root.join(&definition.filename);
        contents = compressor
            .apply(&source, &contents, config)
            .map_err(|e| PipelineError::Compress {
                output: definition.output_path.clone(),
                reason: e.to_string(),
            })?;
    }
    Ok(contents)
}

/// Compile and concatenate the member files of a bundle in memory.
///
/// Each member runs through the compiler registered for its extension, if
/// any; the outputs are concatenated byte-for-byte, no separator. JavaScript
/// bundles get the configured IIFE wrapper when enabled.
pub fn assemble(
    definition: &BundleDefinition,
    root: &Path,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<String, PipelineError> {
    let mut compiled = Vec::with_capacity(definition.files.len());
    for file in &definition.files {
        compiled.push(compile_member(&file.name, root, adapters, config)?);
    }
    let mut contents = compiled.concat();

    if config.wrap_javascript && naming::extname(&definition.identifier) == ".js" {
        contents = config.javascript_iife.replacen("%s", &contents, 1);
    }
    Ok(contents)
}

/// Read and compile a single member file.
pub(super) fn compile_member(
    name: &str,
    root: &Path,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<String, PipelineError> {
    let path = root.join(name);
    let contents = fs::read_to_string(&path).map_err(|e| PipelineError::Read {
        file: name.to_string(),
        reason: e.to_string(),
    })?;
    let Some(compiler) = adapters.compiler_for(naming::extname(name)) else {
        return Ok(contents);
    };
    compiler
        .transform
        .apply(&path, &contents, config)
        .map_err(|e| PipelineError::Compile {
            file: name.to_string(),
            reason: e.to_string(),
        })
}

/// Verify that every adapter a bundle would exercise is synchronous.
///
/// Inline delivery runs on the caller's thread with no completion channel,
/// so an async compiler or compressor cannot participate.
pub fn ensure_sync(
    definition: &BundleDefinition,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<(), PipelineError> {
    for file in &definition.files {
        let ext = naming::extname(&file.name);
        if let Some(compiler) = adapters.compiler_for(ext)
            && compiler.transform.is_async()
        {
            return Err(PipelineError::AsyncAdapter {
                extension: ext.to_string(),
            });
        }
    }
    let ext = naming::extname(&definition.identifier);
    if config.compress
        && let Some(compressor) = adapters.compressor_for(ext)
        && compressor.is_async()
    {
        return Err(PipelineError::AsyncAdapter {
            extension: ext.to_string(),
        });
    }
    Ok(())
}
