//! Compiler and compressor adapter registries.
//!
//! Adapters are registered per extension with an explicit sync/async tag, so
//! the pipeline knows at registration time which contract it is dealing with
//! instead of inspecting signatures per call. Async adapters complete through
//! a callback; the build pipeline bridges them onto its own thread with a
//! rendezvous channel.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

use crossbeam::channel;

use crate::config::Config;

/// Completion callback handed to async adapters.
pub type Callback = Box<dyn FnOnce(anyhow::Result<String>) + Send>;

/// Synchronous adapter: `(source path, contents, config) -> output`.
pub type SyncFn = Box<dyn Fn(&Path, &str, &Config) -> anyhow::Result<String> + Send + Sync>;

/// Asynchronous adapter: same inputs, result delivered via the callback.
pub type AsyncFn = Box<dyn Fn(&Path, &str, &Config, Callback) + Send + Sync>;

/// A compile or compress function with an explicit execution contract.
pub enum Transform {
    Sync(SyncFn),
    Async(AsyncFn),
}

impl Transform {
    pub fn sync(
        f: impl Fn(&Path, &str, &Config) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Sync(Box::new(f))
    }

    pub fn r#async(
        f: impl Fn(&Path, &str, &Config, Callback) + Send + Sync + 'static,
    ) -> Self {
        Self::Async(Box::new(f))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Run the adapter, blocking on async completion.
    ///
    /// There is no timeout: a stalled adapter stalls the calling build (and
    /// everyone waiting on it).
    pub fn apply(&self, path: &Path, input: &str, config: &Config) -> anyhow::Result<String> {
        match self {
            Self::Sync(f) => f(path, input, config),
            Self::Async(f) => {
                let (tx, rx) = channel::bounded(1);
                f(
                    path,
                    input,
                    config,
                    Box::new(move |result| {
                        let _ = tx.send(result);
                    }),
                );
                rx.recv()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("adapter dropped its callback")))
            }
        }
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Transform::Sync"),
            Self::Async(_) => write!(f, "Transform::Async"),
        }
    }
}

/// A registered compiler: maps an input extension to an output extension.
#[derive(Debug)]
pub struct Compiler {
    /// Input extension, e.g. `.less`.
    pub input_ext: String,
    /// Output extension, e.g. `.css`.
    pub output_ext: String,
    pub transform: Transform,
}

/// Registered compilers and compressors, plus the reverse index used for
/// fallback discovery (output extension → compilers, in registration order).
#[derive(Debug, Default)]
pub struct AdapterSet {
    compilers: FxHashMap<String, Arc<Compiler>>,
    by_output: FxHashMap<String, Vec<Arc<Compiler>>>,
    compressors: FxHashMap<String, Transform>,
}

impl AdapterSet {
    /// Register a compiler for an input extension.
    ///
    /// Re-registering an input extension replaces the previous compiler and
    /// moves it to the back of the probe order for its output extension.
    pub fn register_compiler(&mut self, input_ext: &str, output_ext: &str, transform: Transform) {
        let input_ext = to_extname(input_ext);
        let output_ext = to_extname(output_ext);
        let compiler = Arc::new(Compiler {
            input_ext: input_ext.clone(),
            output_ext: output_ext.clone(),
            transform,
        });
        crate::debug!("adapter"; "registered {} ({}) compiler", compiler.input_ext, compiler.output_ext);
        self.compilers.insert(input_ext.clone(), compiler.clone());
        let probes = self.by_output.entry(output_ext).or_default();
        probes.retain(|c| c.input_ext != input_ext);
        probes.push(compiler);
    }

    /// Register a compressor for an output extension.
    pub fn register_compressor(&mut self, ext: &str, transform: Transform) {
        let ext = to_extname(ext);
        crate::debug!("adapter"; "registered {} compressor", ext);
        self.compressors.insert(ext, transform);
    }

    /// Compiler registered for an input extension.
    pub fn compiler_for(&self, ext: &str) -> Option<&Compiler> {
        self.compilers.get(ext).map(Arc::as_ref)
    }

    /// Compilers producing the given output extension, in registration order.
    pub fn compilers_for_output(&self, ext: &str) -> &[Arc<Compiler>] {
        self.by_output.get(ext).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn compressor_for(&self, ext: &str) -> Option<&Transform> {
        self.compressors.get(ext)
    }
}

/// Normalize an extension to lowercase with a leading dot.
pub fn to_extname(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_extname() {
        assert_eq!(to_extname("js"), ".js");
        assert_eq!(to_extname(".LESS"), ".less");
    }

    #[test]
    fn test_sync_apply() {
        let t = Transform::sync(|_, input, _| Ok(input.to_uppercase()));
        let out = t.apply(Path::new("a.js"), "var a;", &Config::default()).unwrap();
        assert_eq!(out, "VAR A;");
        assert!(!t.is_async());
    }

    #[test]
    fn test_async_apply_bridges_callback() {
        let t = Transform::r#async(|_, input, _, done| {
            let input = input.to_string();
            std::thread::spawn(move || done(Ok(format!("{input}!"))));
        });
        let out = t.apply(Path::new("a.js"), "x", &Config::default()).unwrap();
        assert_eq!(out, "x!");
        assert!(t.is_async());
    }

    #[test]
    fn test_async_dropped_callback_is_error() {
        let t = Transform::r#async(|_, _, _, done| drop(done));
        assert!(t.apply(Path::new("a.js"), "x", &Config::default()).is_err());
    }

    #[test]
    fn test_probe_order_is_registration_order() {
        let mut adapters = AdapterSet::default();
        adapters.register_compiler(".less", ".css", Transform::sync(|_, s, _| Ok(s.into())));
        adapters.register_compiler(".styl", ".css", Transform::sync(|_, s, _| Ok(s.into())));

        let probes: Vec<_> = adapters
            .compilers_for_output(".css")
            .iter()
            .map(|c| c.input_ext.clone())
            .collect();
        assert_eq!(probes, [".less", ".styl"]);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut adapters = AdapterSet::default();
        adapters.register_compiler(".less", ".css", Transform::sync(|_, _, _| Ok("v1".into())));
        adapters.register_compiler(".styl", ".css", Transform::sync(|_, _, _| Ok("s".into())));
        adapters.register_compiler(".less", ".css", Transform::sync(|_, _, _| Ok("v2".into())));

        let probes: Vec<_> = adapters
            .compilers_for_output(".css")
            .iter()
            .map(|c| c.input_ext.clone())
            .collect();
        assert_eq!(probes, [".styl", ".less"]);

        let compiler = adapters.compiler_for(".less").unwrap();
        let out = compiler
            .transform
            .apply(Path::new("a.less"), "", &Config::default())
            .unwrap();
        assert_eq!(out, "v2");
    }
}
