//! Identifier resolution: logical name + options → `BundleDefinition`.

use globset::GlobBuilder;
use rustc_hash::FxHashSet;

use crate::adapter::AdapterSet;
use crate::config::{BundleOptions, Config};
use crate::error::PipelineError;
use crate::naming;
use crate::registry::{AssetRegistry, SourceFile};

use super::BundleDefinition;

/// Characters that mark an include/dependency entry as a glob pattern.
const GLOB_METACHARACTERS: [char; 4] = ['*', '?', '{', '}'];

/// Outcome of a resolution: the definition plus any stale generated
/// filenames that were dropped from tracking and should be unlinked.
#[derive(Debug)]
pub struct Resolution {
    pub definition: BundleDefinition,
    pub pruned: Vec<String>,
}

/// Normalize a user-supplied identifier.
///
/// Lowercases it and, when its extension belongs to a registered compiler,
/// rewrites it to the compiler's output extension — users may refer to
/// `styles.less` and get the `styles.css` bundle.
pub fn normalize_identifier(identifier: &str, adapters: &AdapterSet) -> String {
    let identifier = identifier.to_lowercase();
    let ext = naming::extname(&identifier);
    let Some(compiler) = adapters.compiler_for(ext) else {
        return identifier;
    };
    let name = naming::basename(&identifier);
    let stem = &name[..name.len() - ext.len()];
    join_rel(
        naming::dirname(&identifier),
        &format!("{stem}{}", compiler.output_ext),
    )
}

/// Resolve a normalized identifier into a bundle definition.
///
/// The registry is mutated only for generated-artifact bookkeeping: a new
/// bundle hash drops every other tracked generation of the identifier.
pub fn resolve(
    identifier: &str,
    options: BundleOptions,
    registry: &mut AssetRegistry,
    adapters: &AdapterSet,
    config: &Config,
) -> Result<Resolution, PipelineError> {
    // Member file list: explicit includes or the identifier itself.
    let names = match &options.include {
        Some(include) => expand_globs(include, registry, Some(identifier))?,
        None => vec![identifier.to_string()],
    };
    if names.is_empty() {
        return Err(PipelineError::EmptyBundle);
    }

    let in_bundle = options.include.is_some();
    let mut keys = Vec::with_capacity(names.len());
    for name in names {
        keys.push(locate(&name, identifier, in_bundle, registry, adapters)?);
    }
    let keys = dedup_first_seen(keys);
    let files: Vec<SourceFile> = keys
        .iter()
        .map(|key| registry.get(key).cloned().expect("located key"))
        .collect();

    // Declared dependencies contribute to the hash only.
    let mut dependencies = Vec::new();
    if let Some(declared) = &options.dependencies {
        let names = expand_globs(declared, registry, Some(identifier))?;
        for name in dedup_first_seen(names.into_iter().map(|n| n.to_lowercase()).collect()) {
            let Some(file) = registry.get(&name) else {
                return Err(PipelineError::MissingDependency {
                    name,
                    bundle: identifier.to_string(),
                });
            };
            dependencies.push(file.clone());
        }
    }

    // Composite hash over content hashes, content files first.
    let hashes: Vec<String> = files
        .iter()
        .chain(dependencies.iter())
        .map(|file| file.hash.clone())
        .collect();
    let hash = naming::bundle_hash(config.hash, &hashes, config.hash_length);

    let canonical_name = naming::basename(identifier);
    let filename = join_rel(
        naming::dirname(identifier),
        &naming::generated_filename(&config.asset_prefix, &hash, canonical_name),
    );
    let output_path = served_path(&config.serve_prefix, &filename);

    // Any other tracked generation of this identifier is now stale.
    let pruned = registry.prune_generated(identifier, &filename);

    Ok(Resolution {
        definition: BundleDefinition {
            identifier: identifier.to_string(),
            files,
            dependencies,
            options,
            filename,
            output_path,
        },
        pruned,
    })
}

/// Find the registry key for a member filename, probing compiler input
/// extensions when the name itself is absent (`foo.css` may exist as
/// `foo.less`). Probes run in compiler registration order; first match wins.
fn locate(
    name: &str,
    bundle: &str,
    in_bundle: bool,
    registry: &AssetRegistry,
    adapters: &AdapterSet,
) -> Result<String, PipelineError> {
    let name = name.to_lowercase();
    if registry.contains(&name) {
        return Ok(name);
    }

    let ext = naming::extname(&name);
    let stem = join_rel(
        naming::dirname(&name),
        &naming::basename(&name)[..naming::basename(&name).len() - ext.len()],
    );
    let mut tried = Vec::new();
    for compiler in adapters.compilers_for_output(ext) {
        let candidate = format!("{stem}{}", compiler.input_ext);
        if candidate == name {
            continue;
        }
        if registry.contains(&candidate) {
            crate::debug!("resolve"; "asset {} exists as {}", name, candidate);
            return Ok(candidate);
        }
        tried.push(candidate);
    }

    Err(PipelineError::NotFound {
        identifier: name,
        bundle: in_bundle.then(|| bundle.to_string()),
        tried,
    })
}

/// Expand a list of include/dependency entries against the registry.
///
/// Entries containing a glob metacharacter are matched against every known
/// source key (matches sorted for determinism); literal entries pass through
/// untouched. A glob matching nothing is a hard error.
pub fn expand_globs(
    patterns: &[String],
    registry: &AssetRegistry,
    bundle: Option<&str>,
) -> Result<Vec<String>, PipelineError> {
    let mut names = Vec::new();
    for pattern in patterns {
        if !pattern.contains(GLOB_METACHARACTERS) {
            names.push(pattern.clone());
            continue;
        }
        let unmatched = || PipelineError::UnmatchedGlob {
            pattern: pattern.clone(),
            bundle: bundle.map(str::to_string),
        };
        let matcher = GlobBuilder::new(&pattern.to_lowercase())
            .literal_separator(true)
            .build()
            .map_err(|_| unmatched())?
            .compile_matcher();
        let mut matched: Vec<String> = registry
            .source_keys()
            .filter(|key| matcher.is_match(key))
            .map(str::to_string)
            .collect();
        if matched.is_empty() {
            return Err(unmatched());
        }
        matched.sort_unstable();
        names.append(&mut matched);
    }
    Ok(names)
}

/// Remove duplicates keeping the first occurrence.
fn dedup_first_seen(names: Vec<String>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Join a relative directory and a filename with `/`.
fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Prepend the serve prefix to a relative filename.
fn served_path(serve_prefix: &str, filename: &str) -> String {
    format!("{}/{filename}", serve_prefix.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Transform;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> (TempDir, AssetRegistry) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        let mut registry = AssetRegistry::new(dir.path());
        registry.reindex(&Config::default()).unwrap();
        registry.rehash(&Config::default());
        (dir, registry)
    }

    fn less_adapter() -> AdapterSet {
        let mut adapters = AdapterSet::default();
        adapters.register_compiler(".less", ".css", Transform::sync(|_, s, _| Ok(s.to_string())));
        adapters
    }

    #[test]
    fn test_normalize_rewrites_compiler_extension() {
        let adapters = less_adapter();
        assert_eq!(normalize_identifier("Foo.LESS", &adapters), "foo.css");
        assert_eq!(normalize_identifier("css/site.less", &adapters), "css/site.css");
        assert_eq!(normalize_identifier("app.js", &adapters), "app.js");
    }

    #[test]
    fn test_resolve_single_file() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "window.jQuery = {};\n")]);
        let resolution = resolve(
            "jquery.js",
            BundleOptions::default(),
            &mut registry,
            &AdapterSet::default(),
            &Config {
                hash_length: 32,
                ..Config::default()
            },
        )
        .unwrap();
        assert_eq!(
            resolution.definition.output_path,
            "/asset-82470a0982f62504a81cf60128ff61a2-jquery.js"
        );
        assert!(resolution.pruned.is_empty());
    }

    #[test]
    fn test_resolve_missing_is_error() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "x")]);
        let err = resolve(
            "bootstrap.js",
            BundleOptions::default(),
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Asset \"bootstrap.js\" could not be found");
    }

    #[test]
    fn test_include_order_and_dedup() {
        let (_dir, mut registry) = fixture(&[
            ("html5shiv.js", "window.shiv = {};\n"),
            ("respond.js", "window.respond = {};\n"),
        ]);
        let config = Config {
            hash_length: 32,
            ..Config::default()
        };
        let options = BundleOptions {
            include: Some(vec![
                "html5shiv.js".into(),
                "respond.js".into(),
                "html5shiv.js".into(), // duplicate keeps first occurrence
            ]),
            ..Default::default()
        };
        let resolution = resolve("ie8.js", options, &mut registry, &AdapterSet::default(), &config).unwrap();
        let names: Vec<_> = resolution.definition.files.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, ["html5shiv.js", "respond.js"]);
        assert_eq!(
            resolution.definition.output_path,
            "/asset-b5d5d67465f661c1a12da394e502b391-ie8.js"
        );
    }

    #[test]
    fn test_include_missing_names_bundle() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "x")]);
        let options = BundleOptions {
            include: Some(vec!["missing.js".into()]),
            ..Default::default()
        };
        let err = resolve(
            "bundle.js",
            options,
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Asset \"missing.js\" could not be found when building asset \"bundle.js\""
        );
    }

    #[test]
    fn test_compiler_fallback_probing() {
        let (_dir, mut registry) = fixture(&[("css/site.less", "a { b: c }")]);
        let mut adapters = AdapterSet::default();
        adapters.register_compiler(".styl", ".css", Transform::sync(|_, s, _| Ok(s.into())));
        adapters.register_compiler(".less", ".css", Transform::sync(|_, s, _| Ok(s.into())));

        let resolution = resolve(
            "css/site.css",
            BundleOptions::default(),
            &mut registry,
            &adapters,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(resolution.definition.files[0].name, "css/site.less");
    }

    #[test]
    fn test_fallback_error_lists_probed_names() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "x")]);
        let mut adapters = AdapterSet::default();
        adapters.register_compiler(".styl", ".css", Transform::sync(|_, s, _| Ok(s.into())));
        adapters.register_compiler(".less", ".css", Transform::sync(|_, s, _| Ok(s.into())));

        let err = resolve(
            "site.css",
            BundleOptions::default(),
            &mut registry,
            &adapters,
            &Config::default(),
        )
        .unwrap_err();
        // Probe order mirrors registration order
        assert_eq!(
            err.to_string(),
            "Asset \"site.css\" could not be found (tried \"site.styl\", \"site.less\")"
        );
    }

    #[test]
    fn test_glob_expansion_matches_registry() {
        let (_dir, mut registry) = fixture(&[
            ("js/a.js", "a"),
            ("js/b.js", "b"),
            ("js/vendor/c.js", "c"),
            ("css/d.css", "d"),
        ]);
        let names = expand_globs(&["js/*.js".to_string()], &registry, None).unwrap();
        assert_eq!(names, ["js/a.js", "js/b.js"]); // * does not cross /

        let options = BundleOptions {
            include: Some(vec!["js/*.js".into()]),
            ..Default::default()
        };
        let resolution = resolve(
            "js/all.js",
            options,
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(resolution.definition.files.len(), 2);
    }

    #[test]
    fn test_unmatched_glob_is_error() {
        let (_dir, registry) = fixture(&[("jquery.js", "x")]);
        let err = expand_globs(&["*.coffee".to_string()], &registry, Some("all.js")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no assets matched the pattern \"*.coffee\" when building asset \"all.js\""
        );
    }

    #[test]
    fn test_dependencies_affect_hash_only() {
        let (_dir, mut registry) = fixture(&[
            ("site.css", "body {}"),
            ("mixins.less", ".mixin() {}"),
        ]);
        let config = Config::default();

        let plain = resolve(
            "site.css",
            BundleOptions::default(),
            &mut registry,
            &AdapterSet::default(),
            &config,
        )
        .unwrap();
        let with_dep = resolve(
            "site.css",
            BundleOptions {
                dependencies: Some(vec!["mixins.less".into()]),
                ..Default::default()
            },
            &mut registry,
            &AdapterSet::default(),
            &config,
        )
        .unwrap();

        assert_ne!(plain.definition.filename, with_dep.definition.filename);
        assert_eq!(with_dep.definition.files.len(), 1);
        assert_eq!(with_dep.definition.dependencies.len(), 1);
    }

    #[test]
    fn test_missing_dependency_is_error() {
        let (_dir, mut registry) = fixture(&[("site.css", "body {}")]);
        let err = resolve(
            "site.css",
            BundleOptions {
                dependencies: Some(vec!["nope.less".into()]),
                ..Default::default()
            },
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to locate \"nope.less\" when finding dependencies for \"site.css\""
        );
    }

    #[test]
    fn test_empty_include_is_error() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "x")]);
        let err = resolve(
            "bundle.js",
            BundleOptions {
                include: Some(vec![]),
                ..Default::default()
            },
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyBundle));
    }

    #[test]
    fn test_stale_generations_pruned() {
        let (_dir, mut registry) = fixture(&[("jquery.js", "window.jQuery = {};\n")]);
        registry.track_generated("jquery.js", "asset-00000000-jquery.js");

        let resolution = resolve(
            "jquery.js",
            BundleOptions::default(),
            &mut registry,
            &AdapterSet::default(),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(resolution.pruned, ["asset-00000000-jquery.js"]);
    }
}
