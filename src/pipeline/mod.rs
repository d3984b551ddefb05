//! The asset pipeline: registry, resolution, builds and markup in one place.
//!
//! A `Pipeline` is configured and populated with adapters while it is still
//! exclusively owned, then initialized and shared (typically behind an `Arc`)
//! with the serving layer and the hot-reload watcher. All query methods take
//! `&self` and are safe to call from any thread.

pub mod build;
pub mod flight;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapter::{AdapterSet, Transform};
use crate::bundle::{self, BundleDefinition};
use crate::config::{BundleOptions, Config};
use crate::error::PipelineError;
use crate::events::{AssetEvent, EventHub};
use crate::markup::{Attributes, FormatterSet, InlineFormatter, TagFormatter};
use crate::naming;
use crate::registry::AssetRegistry;

use flight::FlightTable;

pub struct Pipeline {
    root: PathBuf,
    config: Config,
    adapters: AdapterSet,
    formatters: FormatterSet,
    registry: RwLock<AssetRegistry>,
    /// Stored definitions by normalized identifier. First definition wins
    /// for option defaults on repeat references.
    bundles: Mutex<FxHashMap<String, BundleDefinition>>,
    flights: FlightTable,
    events: EventHub,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        Self {
            registry: RwLock::new(AssetRegistry::new(root.clone())),
            root,
            config,
            adapters: AdapterSet::default(),
            formatters: FormatterSet::default(),
            bundles: Mutex::new(FxHashMap::default()),
            flights: FlightTable::default(),
            events: EventHub::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Registration runs before the pipeline is shared, hence `&mut self`.

    pub fn register_compiler(&mut self, input_ext: &str, output_ext: &str, transform: Transform) {
        self.adapters.register_compiler(input_ext, output_ext, transform);
    }

    pub fn register_compressor(&mut self, ext: &str, transform: Transform) {
        self.adapters.register_compressor(ext, transform);
    }

    pub fn register_tag(&mut self, ext: &str, formatter: TagFormatter) {
        self.formatters.register_tag(ext, formatter);
    }

    pub fn register_inline(&mut self, ext: &str, formatter: InlineFormatter) {
        self.formatters.register_inline(ext, formatter);
    }

    /// Subscribe to change, removal and prune events.
    pub fn subscribe(&self) -> crossbeam::channel::Receiver<AssetEvent> {
        self.events.subscribe()
    }

    /// Index the asset root and fill in content hashes.
    ///
    /// Must run before the first resolution. Safe to call again for a full
    /// rescan.
    pub fn init(&self) -> Result<(), PipelineError> {
        let mut registry = self.registry.write();
        registry.reindex(&self.config)?;
        registry.rehash(&self.config);
        crate::log!("index"; "indexed {} asset(s) in {}", registry.len(), self.root.display());
        Ok(())
    }

    /// Resolve an identifier to its served path, e.g.
    /// `/js/asset-b5d5d67465f661c1-all.js`.
    ///
    /// This only names the output; the file itself is built lazily when the
    /// serving layer intercepts a request for it.
    pub fn asset_path(
        &self,
        identifier: &str,
        options: BundleOptions,
    ) -> Result<String, PipelineError> {
        Ok(self.define(identifier, options)?.output_path)
    }

    /// Resolve an identifier to a full URL, honoring the configured (or
    /// per-bundle) URL prefix.
    pub fn asset_url(
        &self,
        identifier: &str,
        options: BundleOptions,
    ) -> Result<String, PipelineError> {
        let definition = self.define(identifier, options)?;
        Ok(self.url_for(&definition))
    }

    /// Resolve an identifier and render it as an HTML tag (or tags).
    pub fn asset_html(
        &self,
        identifier: &str,
        options: BundleOptions,
    ) -> Result<String, PipelineError> {
        let definition = self.define(identifier, options)?;
        let attributes = definition.options.attributes.clone().unwrap_or_default();

        if definition.options.inline.unwrap_or(false) {
            return self.inline_tags(&definition, &attributes);
        }

        if self.config.separate_bundles && definition.options.include.is_some() {
            return self.member_tags(&definition, &attributes);
        }

        let ext = naming::extname(&definition.identifier);
        let Some(tag) = self.formatters.tag_for(ext) else {
            return Err(PipelineError::UnknownTagFormat {
                extension: ext.to_string(),
            });
        };
        Ok(tag(&self.url_for(&definition), &self.config, &attributes))
    }

    /// Resolve an identifier and return the built contents directly, without
    /// touching the filesystem output. Requires synchronous adapters.
    pub fn asset_inline(
        &self,
        identifier: &str,
        options: BundleOptions,
    ) -> Result<String, PipelineError> {
        let definition = self.define(identifier, options)?;
        build::ensure_sync(&definition, &self.adapters, &self.config)?;
        build::build_contents(&definition, &self.root, &self.adapters, &self.config)
    }

    /// One inline tag per member file, compiled on the spot.
    fn inline_tags(
        &self,
        definition: &BundleDefinition,
        attributes: &Attributes,
    ) -> Result<String, PipelineError> {
        build::ensure_sync(definition, &self.adapters, &self.config)?;
        let ext = naming::extname(&definition.identifier);
        let Some(inline) = self.formatters.inline_for(ext) else {
            return Err(PipelineError::UnknownTagFormat {
                extension: ext.to_string(),
            });
        };
        let mut tags = Vec::with_capacity(definition.files.len());
        for file in &definition.files {
            let contents =
                build::compile_member(&file.name, &self.root, &self.adapters, &self.config)?;
            tags.push(inline(&contents, &self.config, attributes));
        }
        Ok(tags.join("\n"))
    }

    /// One linked tag per member file, each addressed by its own hash.
    fn member_tags(
        &self,
        definition: &BundleDefinition,
        attributes: &Attributes,
    ) -> Result<String, PipelineError> {
        let mut tags = Vec::with_capacity(definition.files.len());
        for file in &definition.files {
            let member = self.define(
                &file.name,
                BundleOptions {
                    url_prefix: definition.options.url_prefix.clone(),
                    ..Default::default()
                },
            )?;
            let ext = naming::extname(&member.identifier);
            let Some(tag) = self.formatters.tag_for(ext) else {
                return Err(PipelineError::UnknownTagFormat {
                    extension: ext.to_string(),
                });
            };
            tags.push(tag(&self.url_for(&member), &self.config, attributes));
        }
        Ok(tags.join("\n"))
    }

    /// Normalize, merge stored options, resolve against the live registry
    /// and store the resulting definition.
    fn define(
        &self,
        identifier: &str,
        mut options: BundleOptions,
    ) -> Result<BundleDefinition, PipelineError> {
        let identifier = bundle::normalize_identifier(identifier, &self.adapters);
        if let Some(stored) = self.bundles.lock().get(&identifier) {
            options.merge_missing(&stored.options);
        }

        let resolution = {
            let mut registry = self.registry.write();
            bundle::resolve(&identifier, options, &mut registry, &self.adapters, &self.config)?
        };

        for stale in resolution.pruned {
            let path = self.root.join(&stale);
            if fs::remove_file(&path).is_ok() {
                crate::debug!("build"; "removed stale asset {}", stale);
            }
            self.events.emit(AssetEvent::Pruned(stale));
        }

        let definition = resolution.definition;
        self.bundles
            .lock()
            .insert(identifier, definition.clone());
        Ok(definition)
    }

    /// Full URL for a resolved definition: per-bundle prefix, then the
    /// configured one, then none.
    fn url_for(&self, definition: &BundleDefinition) -> String {
        let prefix = definition
            .options
            .url_prefix
            .as_deref()
            .unwrap_or(&self.config.url_prefix);
        if prefix.is_empty() {
            definition.output_path.clone()
        } else {
            format!("{}{}", prefix.trim_end_matches('/'), definition.output_path)
        }
    }

    pub(crate) fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    pub(crate) fn registry(&self) -> &RwLock<AssetRegistry> {
        &self.registry
    }

    pub(crate) fn flights(&self) -> &FlightTable {
        &self.flights
    }

    pub(crate) fn events(&self) -> &EventHub {
        &self.events
    }

    /// Stored definition for a canonical (lowercased) identifier, if any.
    pub(crate) fn bundle_for(&self, identifier: &str) -> Option<BundleDefinition> {
        self.bundles.lock().get(identifier).cloned()
    }
}
