//! OCR engine abstraction and the Tesseract command-line backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OcrError;

/// Tesseract page segmentation modes used by the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation.
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
    /// A single uniform block of text.
    #[default]
    SingleBlock,
    /// A single text line.
    SingleLine,
    /// As much text as possible, in no particular order.
    SparseText,
}

impl PageSegMode {
    /// Value for Tesseract's `--psm` flag.
    pub fn as_arg(self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SparseText => "11",
        }
    }
}

/// Black-box text recognizer.
pub trait OcrEngine {
    /// Recognize text in an already preprocessed image.
    ///
    /// An image without text yields `Ok` with empty or whitespace-only text;
    /// `Err` is reserved for engine failures.
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: PageSegMode,
    ) -> Result<String, OcrError>;
}

/// Runs the `tesseract` executable on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, input: &Path, language: &str, mode: PageSegMode) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(mode.as_arg());
        cmd
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: PageSegMode,
    ) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("receipt-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Preprocessing(format!("cannot create temporary image: {e}")))?
            .into_temp_path();

        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(format!("cannot write temporary image: {e}")))?;

        debug!(
            "Running {} (lang={}, psm={})",
            self.binary.display(),
            language,
            mode.as_arg()
        );

        let output = self
            .command(&input, language, mode)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::EngineUnavailable(format!(
                    "{} not found; is Tesseract installed?",
                    self.binary.display()
                )),
                _ => OcrError::EngineUnavailable(format!("{}: {}", self.binary.display(), e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| OcrError::Engine(format!("output is not valid UTF-8: {e}")))
    }
}
