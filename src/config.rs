//! Pipeline configuration and per-bundle options.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::digest::HashAlgorithm;

/// Top-level pipeline configuration.
///
/// All fields have defaults matching a conventional setup, so embedding
/// applications can start from `Config::default()` and override selectively,
/// or deserialize the whole struct from a TOML section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for generated filenames (`<prefix>-<hash>-<name>`).
    pub asset_prefix: String,
    /// Digest algorithm for content hashes.
    pub hash: HashAlgorithm,
    /// Truncation length (hex chars) for bundle hashes in filenames.
    pub hash_length: usize,
    /// Manifest filename, stored at the asset root.
    pub manifest: String,
    /// Path prefix assets are served under.
    pub serve_prefix: String,
    /// Optional URL prefix (e.g. a CDN host) prepended to asset URLs.
    pub url_prefix: String,
    /// Run registered compressors on build outputs.
    pub compress: bool,
    /// Watch the asset root and reindex on changes.
    pub hot_reload: bool,
    /// Wrap concatenated JavaScript bundles in the configured IIFE template.
    pub wrap_javascript: bool,
    /// IIFE template; `%s` is replaced with the bundle contents.
    pub javascript_iife: String,
    /// Emit one tag per include member instead of a single bundle tag.
    pub separate_bundles: bool,
    /// Omit legacy `type` attributes from generated tags.
    pub html5: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_prefix: "asset".to_string(),
            hash: HashAlgorithm::Md5,
            hash_length: 16,
            manifest: ".asset-manifest".to_string(),
            serve_prefix: "/".to_string(),
            url_prefix: String::new(),
            compress: false,
            hot_reload: false,
            wrap_javascript: false,
            javascript_iife: "!function(){%s}();".to_string(),
            separate_bundles: false,
            html5: false,
        }
    }
}

impl Config {
    /// Parse a configuration from a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

/// Per-bundle options supplied at resolution time.
///
/// Unset fields of a repeat reference are filled from the stored definition
/// (first definition wins); explicitly supplied fields override it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    /// Member files (literal names or glob patterns). When unset the bundle
    /// is the single identifier itself.
    pub include: Option<Vec<String>>,
    /// Files that contribute to the bundle hash but not its contents
    /// (e.g. transitively imported sources the pipeline can't see).
    pub dependencies: Option<Vec<String>>,
    /// Extra HTML attributes for generated tags.
    pub attributes: Option<BTreeMap<String, String>>,
    /// Embed the built contents directly instead of linking them.
    pub inline: Option<bool>,
    /// Per-call URL prefix override.
    pub url_prefix: Option<String>,
}

impl BundleOptions {
    /// Fill unset fields from a previously stored set of options.
    ///
    /// Attribute maps are merged key-wise: keys present here are kept,
    /// missing keys are taken from `existing`.
    pub fn merge_missing(&mut self, existing: &BundleOptions) {
        if self.include.is_none() {
            self.include = existing.include.clone();
        }
        if self.dependencies.is_none() {
            self.dependencies = existing.dependencies.clone();
        }
        if self.inline.is_none() {
            self.inline = existing.inline;
        }
        if self.url_prefix.is_none() {
            self.url_prefix = existing.url_prefix.clone();
        }
        match (&mut self.attributes, &existing.attributes) {
            (None, Some(theirs)) => self.attributes = Some(theirs.clone()),
            (Some(ours), Some(theirs)) => {
                for (key, value) in theirs {
                    ours.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            _ => {}
        }
    }
}
