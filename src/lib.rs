//! Content-addressed static asset pipeline.
//!
//! Assets are indexed from a root directory, addressed by a digest of their
//! contents (`asset-<hash>-<name>`), and built lazily the first time their
//! generated URL is requested. Bundles concatenate multiple sources behind a
//! single identifier; compilers and compressors plug in per file extension;
//! a persistent manifest keeps restarts from rehashing unchanged files; an
//! optional watcher keeps everything current while developing.

pub mod adapter;
pub mod bundle;
pub mod config;
pub mod digest;
pub mod error;
pub mod events;
pub mod logger;
pub mod markup;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod serve;
pub mod watch;

pub use adapter::Transform;
pub use config::{BundleOptions, Config};
pub use digest::HashAlgorithm;
pub use error::PipelineError;
pub use events::AssetEvent;
pub use pipeline::Pipeline;
pub use serve::Intercept;
pub use watch::WatchHandle;
