//! Serving-layer interception of generated asset requests.
//!
//! The pipeline does not serve files itself. A host HTTP layer calls
//! `Pipeline::intercept` with each request path; the pipeline either
//! recognizes a generated filename and makes sure it exists on disk, or
//! tells the host to fall through to its own static handling.

use std::path::PathBuf;

use crate::error::PipelineError;
use crate::naming;
use crate::pipeline::Pipeline;
use crate::pipeline::build::compile_bundle;
use crate::pipeline::flight::Ticket;

/// Result of asking the pipeline about a request path.
#[derive(Debug)]
pub enum Intercept {
    /// The path does not name a generated asset; serve it as plain static.
    NotGenerated,
    /// Generated-looking path with no matching bundle (unknown identifier
    /// or a stale hash); the host should 404.
    Unknown,
    /// The built file, guaranteed to exist at the returned absolute path.
    Built(PathBuf),
}

impl Pipeline {
    /// Intercept a request path, building the named bundle on demand.
    ///
    /// Concurrent requests for the same output coalesce into one build; the
    /// outcome, success or failure, is shared by every caller.
    pub fn intercept(&self, request_path: &str) -> Result<Intercept, PipelineError> {
        let config = self.config();
        let prefix = config.serve_prefix.trim_end_matches('/');
        let Some(rel) = request_path.strip_prefix(prefix) else {
            return Ok(Intercept::NotGenerated);
        };
        // The prefix must end at a path-segment boundary
        if !prefix.is_empty() && !rel.starts_with('/') {
            return Ok(Intercept::NotGenerated);
        }
        let rel = rel.trim_start_matches('/').to_lowercase();

        let Some(canonical) = naming::canonical_path(&config.asset_prefix, &rel) else {
            return Ok(Intercept::NotGenerated);
        };
        let Some(definition) = self.bundle_for(&canonical) else {
            return Ok(Intercept::Unknown);
        };
        if definition.filename != rel {
            // A previously valid URL whose hash no longer matches
            return Ok(Intercept::Unknown);
        }

        let output = self.root().join(&definition.filename);
        if output.exists() {
            return Ok(Intercept::Built(output));
        }

        // One build per canonical output at a time
        match self.flights().join(&canonical) {
            Ticket::Lead => {
                // A racing flight may have finished between the exists
                // check and joining
                if output.exists() {
                    self.flights().complete(&canonical, &Ok(output.clone()));
                    return Ok(Intercept::Built(output));
                }
                crate::log!("serve"; "building {}", definition.output_path);
                let outcome = compile_bundle(&definition, self.root(), self.adapters(), config);
                if outcome.is_ok() {
                    self.registry()
                        .write()
                        .track_generated(&canonical, &definition.filename);
                }
                self.flights().complete(&canonical, &outcome);
                outcome.map(Intercept::Built)
            }
            Ticket::Wait(rx) => match rx.recv() {
                Ok(outcome) => outcome.map(Intercept::Built),
                Err(_) => Err(PipelineError::Compile {
                    file: definition.filename.clone(),
                    reason: "builder disconnected".to_string(),
                }),
            },
        }
    }
}
