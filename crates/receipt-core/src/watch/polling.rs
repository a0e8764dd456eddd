//! Polling change source for platforms without usable native notifications.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::WatchError;

use super::files::enumerate_files;
use super::source::ChangeSource;

/// Granularity at which the polling thread checks for a stop request.
const STOP_CHECK: Duration = Duration::from_millis(50);

/// Rescans the directory every interval and reports files it has not seen before.
pub struct PollingSource {
    interval: Duration,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PollingSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop_flag: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl ChangeSource for PollingSource {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn subscribe(
        &mut self,
        root: &Path,
        recursive: bool,
        events: Sender<PathBuf>,
    ) -> Result<(), WatchError> {
        self.stop()?;

        // Files present at subscription time are not creations.
        let mut snapshot = Snapshot::new(enumerate_files(root, recursive)?);
        let root = root.to_path_buf();
        let interval = self.interval;
        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);

        debug!("Polling {} every {:?}", root.display(), interval);

        let handle = thread::Builder::new()
            .name("receipt-poller".to_string())
            .spawn(move || {
                while sleep_unless_stopped(interval, &stop_flag) {
                    let current = match enumerate_files(&root, recursive) {
                        Ok(files) => files,
                        Err(e) => {
                            warn!("Rescan of {} failed: {}", root.display(), e);
                            continue;
                        }
                    };
                    for path in snapshot.update(current) {
                        if events.send(path).is_err() {
                            return;
                        }
                    }
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), WatchError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Polling thread panicked");
            }
        }
        Ok(())
    }
}

impl Drop for PollingSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Sleep for `interval` in small steps. Returns false once a stop was requested.
fn sleep_unless_stopped(interval: Duration, stop_flag: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(STOP_CHECK.min(deadline - now));
    }
}

/// Set of known files.
#[derive(Debug, Default)]
struct Snapshot {
    known: HashSet<PathBuf>,
}

impl Snapshot {
    fn new(files: Vec<PathBuf>) -> Self {
        Self {
            known: files.into_iter().collect(),
        }
    }

    /// Replace the snapshot and return files absent from the previous one, in scan order.
    fn update(&mut self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let created = files
            .iter()
            .filter(|path| !self.known.contains(*path))
            .cloned()
            .collect();
        self.known = files.into_iter().collect();
        created
    }
}
