//! Native OS file notifications through the `notify` crate.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::WatchError;

use super::source::ChangeSource;

/// Change source backed by the platform's recommended watcher
/// (inotify, FSEvents, ReadDirectoryChangesW, ...).
pub struct NativeSource {
    watcher: Option<RecommendedWatcher>,
    root: Option<PathBuf>,
}

impl NativeSource {
    pub fn new() -> Self {
        Self {
            watcher: None,
            root: None,
        }
    }

    /// Whether a native watcher can be created on this machine right now.
    pub fn is_supported() -> bool {
        notify::recommended_watcher(|_: notify::Result<Event>| {}).is_ok()
    }
}

/// Paths that appeared under the watched root: created files and rename
/// destinations.
///
/// Backends that report a paired rename (`Both`) also report its `To` half,
/// so only `To` is forwarded. `Any` renames (FSEvents) name the source and the
/// destination alike; only paths that still exist are kept.
fn arrived_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.into_iter().filter(|path| path.exists()).collect()
        }
        _ => Vec::new(),
    }
}

impl Default for NativeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for NativeSource {
    fn name(&self) -> &'static str {
        "native"
    }

    fn subscribe(
        &mut self,
        root: &Path,
        recursive: bool,
        events: Sender<PathBuf>,
    ) -> Result<(), WatchError> {
        if !root.is_dir() {
            return Err(WatchError::MissingDirectory(root.to_path_buf()));
        }
        self.stop()?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in arrived_paths(event) {
                    // The receiver is gone once the scanner has stopped.
                    if events.send(path).is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("File notification error: {}", e),
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root, mode)?;
        debug!("Native watcher on {} ({:?})", root.display(), mode);

        self.watcher = Some(watcher);
        self.root = Some(root.to_path_buf());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), WatchError> {
        if let (Some(mut watcher), Some(root)) = (self.watcher.take(), self.root.take()) {
            if let Err(e) = watcher.unwatch(&root) {
                debug!("Unwatching {} failed: {}", root.display(), e);
            }
            // Dropping the watcher shuts down its event loop.
            drop(watcher);
        }
        Ok(())
    }
}

impl Drop for NativeSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
