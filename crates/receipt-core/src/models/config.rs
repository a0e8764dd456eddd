//! Configuration structures for the receipt scanner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ocr::PageSegMode;

/// Main configuration for the receipt scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Directory to watch for new receipt images.
    pub watch_dir: PathBuf,

    /// Ledger file that parsed receipts are appended to.
    pub output_csv: PathBuf,

    /// Watch subdirectories of `watch_dir` as well.
    pub recursive: bool,

    /// Rescan interval in seconds when polling is used instead of native events.
    pub poll_interval_secs: f64,

    /// File suffixes treated as receipt images, matched case-insensitively.
    /// PDF is not accepted.
    pub supported_extensions: Vec<String>,

    /// Parse receipts but never write the ledger.
    pub dry_run: bool,

    /// Seconds a watched file's size must stay unchanged before it is read; zero disables.
    pub settle_secs: f64,

    /// How file creation is detected.
    pub watch_mode: WatchMode,

    /// OCR engine configuration.
    pub ocr: OcrConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("."),
            output_csv: PathBuf::from("receipts.csv"),
            recursive: false,
            poll_interval_secs: 1.0,
            supported_extensions: [".png", ".jpg", ".jpeg", ".tif", ".tiff", ".bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dry_run: false,
            settle_secs: 0.25,
            watch_mode: WatchMode::default(),
            ocr: OcrConfig::default(),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language hint passed to Tesseract (e.g. `jpn`, `jpn+eng`).
    pub language: String,

    /// Tesseract executable, looked up on `PATH` when not absolute.
    pub binary: PathBuf,

    /// Page segmentation mode.
    pub page_segmentation: PageSegMode,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "jpn".to_string(),
            binary: PathBuf::from("tesseract"),
            page_segmentation: PageSegMode::SingleBlock,
        }
    }
}

/// Source of file creation notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// Native OS events, falling back to polling when unavailable.
    #[default]
    Auto,
    /// Native OS events only.
    Native,
    /// Periodic directory rescans.
    Polling,
}

impl ScannerConfig {
    /// Create a configuration for the given directory and ledger path.
    pub fn new(watch_dir: impl Into<PathBuf>, output_csv: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            output_csv: output_csv.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Make `watch_dir` and `output_csv` absolute against the current directory.
    pub fn resolve_paths(&mut self) -> Result<(), std::io::Error> {
        self.watch_dir = std::path::absolute(&self.watch_dir)?;
        self.output_csv = std::path::absolute(&self.output_csv)?;
        Ok(())
    }

    /// Create the watch directory and the ledger's parent directory if missing.
    pub fn ensure_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.watch_dir)?;
        if let Some(parent) = self.output_csv.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Polling interval as a duration. Non-positive or non-finite values fall back to one second.
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_secs.is_finite() && self.poll_interval_secs > 0.0 {
            Duration::from_secs_f64(self.poll_interval_secs)
        } else {
            Duration::from_secs(1)
        }
    }

    /// Settle interval as a duration. Non-positive or non-finite values disable the wait.
    pub fn settle_interval(&self) -> Duration {
        if self.settle_secs.is_finite() && self.settle_secs > 0.0 {
            Duration::from_secs_f64(self.settle_secs)
        } else {
            Duration::ZERO
        }
    }

    /// Check whether `path` has one of the supported extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        has_supported_extension(path, &self.supported_extensions)
    }
}

/// Case-insensitive suffix match. Entries may be written as `.png` or `png`.
pub fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();

    extensions
        .iter()
        .any(|candidate| candidate.trim_start_matches('.').to_lowercase() == ext)
}
