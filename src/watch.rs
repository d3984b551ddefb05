//! Hot reload: keep the registry in sync with the asset root.
//!
//! A background thread owns the filesystem watcher and applies changes
//! incrementally. File-level events update a single registry entry;
//! directory-level events (created or removed folders) trigger a full
//! rescan and re-attach the watcher, since the directory set changed.

use crossbeam::channel::{self, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::events::AssetEvent;
use crate::naming;
use crate::pipeline::Pipeline;

/// Handle to a running watcher thread. Dropping it stops the watcher and
/// joins the thread.
pub struct WatchHandle {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Pipeline {
    /// Start watching the asset root for changes.
    ///
    /// Each directory containing a source file is watched non-recursively.
    /// Generated artifacts and the manifest never trigger reindexing, so
    /// builds do not feed back into the watcher.
    pub fn watch(self: &Arc<Self>) -> notify::Result<WatchHandle> {
        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let _ = event_tx.send(result);
        })?;

        let mut watched = self.registry().read().watch_dirs();
        for dir in &watched {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        crate::log!("watch"; "watching {} directories under {}", watched.len(), self.root().display());

        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let pipeline = Arc::clone(self);
        let thread = thread::spawn(move || {
            loop {
                crossbeam::select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(event_rx) -> message => {
                        let event = match message {
                            Ok(Ok(event)) => event,
                            Ok(Err(e)) => {
                                crate::log!("error"; "watch error: {}", e);
                                continue;
                            }
                            Err(_) => break,
                        };
                        pipeline.apply_fs_event(event, &mut watcher, &mut watched);
                    }
                }
            }
        });

        Ok(WatchHandle {
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }

    fn apply_fs_event(
        &self,
        event: notify::Event,
        watcher: &mut RecommendedWatcher,
        watched: &mut Vec<PathBuf>,
    ) {
        let config = self.config();
        for path in &event.paths {
            let Some(rel) = relative_name(self.root(), path) else {
                continue;
            };
            if rel == config.manifest || naming::is_generated(&config.asset_prefix, &rel) {
                continue;
            }
            if path.is_dir() {
                self.rescan(watcher, watched);
                self.events().emit(AssetEvent::Changed(rel.to_lowercase()));
                return;
            }
            if path.exists() {
                crate::debug!("watch"; "changed: {}", rel);
                let mut registry = self.registry().write();
                if let Err(e) = registry.upsert(&rel, config) {
                    crate::log!("error"; "failed to index {}: {}", rel, e);
                    continue;
                }
                if let Err(e) = registry.write_manifest(config) {
                    crate::log!("error"; "{}", e);
                }
                drop(registry);
                self.events().emit(AssetEvent::Changed(rel.to_lowercase()));
            } else {
                crate::debug!("watch"; "removed: {}", rel);
                let mut registry = self.registry().write();
                registry.remove(&rel);
                if let Err(e) = registry.write_manifest(config) {
                    crate::log!("error"; "{}", e);
                }
                drop(registry);
                self.events().emit(AssetEvent::Removed(rel.to_lowercase()));
            }
        }
    }

    /// Full rescan after a directory-level change, re-attaching the watcher
    /// to the current directory set.
    fn rescan(&self, watcher: &mut RecommendedWatcher, watched: &mut Vec<PathBuf>) {
        crate::debug!("watch"; "directory change, rescanning");
        {
            let mut registry = self.registry().write();
            if let Err(e) = registry.reindex(self.config()) {
                crate::log!("error"; "{}", e);
                return;
            }
            registry.rehash(self.config());
        }
        for dir in watched.iter() {
            let _ = watcher.unwatch(dir);
        }
        *watched = self.registry().read().watch_dirs();
        for dir in watched.iter() {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                crate::log!("error"; "failed to watch {}: {}", dir.display(), e);
            }
        }
    }
}

/// Root-relative, slash-separated name for a watched path.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut name = String::new();
    for component in rel.components() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(component.as_os_str().to_str()?);
    }
    (!name.is_empty()).then_some(name)
}
