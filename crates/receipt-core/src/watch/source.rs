//! Sources of "file created" notifications.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::warn;

use crate::error::WatchError;
use crate::models::config::WatchMode;

use super::native::NativeSource;
use super::polling::PollingSource;

/// Something that reports newly created files under a directory.
///
/// Events are delivered from the source's own thread; `stop` must release
/// that thread and any OS handle before returning.
pub trait ChangeSource: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Start delivering the paths of created files to `events`.
    fn subscribe(
        &mut self,
        root: &Path,
        recursive: bool,
        events: Sender<PathBuf>,
    ) -> Result<(), WatchError>;

    /// Stop delivering events. Calling it twice is harmless.
    fn stop(&mut self) -> Result<(), WatchError>;
}

/// Pick a change source for `mode`. `Auto` prefers native events and falls
/// back to polling when the platform watcher cannot be created.
pub fn select_change_source(
    mode: WatchMode,
    poll_interval: Duration,
) -> Result<Box<dyn ChangeSource>, WatchError> {
    match mode {
        WatchMode::Polling => Ok(Box::new(PollingSource::new(poll_interval))),
        WatchMode::Native => Ok(Box::new(NativeSource::new())),
        WatchMode::Auto => {
            if NativeSource::is_supported() {
                Ok(Box::new(NativeSource::new()))
            } else {
                warn!("Native file notifications unavailable, polling every {:?}", poll_interval);
                Ok(Box::new(PollingSource::new(poll_interval)))
            }
        }
    }
}
