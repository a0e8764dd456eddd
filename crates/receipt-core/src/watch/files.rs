//! Enumerating receipt images already present in a directory, and waiting
//! for files that are still being written.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use glob::{glob_with, MatchOptions, Pattern};

use crate::error::WatchError;
use crate::models::config::has_supported_extension;

/// All regular files under `dir`, in glob's sorted order.
pub fn enumerate_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, WatchError> {
    if !dir.is_dir() {
        return Err(WatchError::MissingDirectory(dir.to_path_buf()));
    }

    let base = Pattern::escape(&dir.to_string_lossy());
    let pattern = if recursive {
        format!("{}/**/*", base.trim_end_matches('/'))
    } else {
        format!("{}/*", base.trim_end_matches('/'))
    };

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    Ok(glob_with(&pattern, options)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect())
}

/// Receipt images under `dir`: non-directory entries with an accepted extension.
pub fn enumerate_receipts(
    dir: &Path,
    extensions: &[String],
    recursive: bool,
) -> Result<Vec<PathBuf>, WatchError> {
    Ok(enumerate_files(dir, recursive)?
        .into_iter()
        .filter(|path| has_supported_extension(path, extensions))
        .collect())
}

/// Block until the size of `path` is non-zero and unchanged across two checks
/// `interval` apart. Returns `false` if that does not happen within `max_wait`
/// or the file disappears.
pub fn wait_until_settled(path: &Path, interval: Duration, max_wait: Duration) -> bool {
    let deadline = Instant::now() + max_wait;
    let Ok(mut last) = fs::metadata(path).map(|m| m.len()) else {
        return false;
    };

    loop {
        if Instant::now() + interval > deadline {
            return false;
        }
        thread::sleep(interval);

        let Ok(size) = fs::metadata(path).map(|m| m.len()) else {
            return false;
        };
        if size > 0 && size == last {
            return true;
        }
        last = size;
    }
}
