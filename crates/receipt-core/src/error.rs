//! Error types for the receipt-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the receipt library.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// Image loading, preprocessing or OCR engine error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Ledger write error.
    #[error("ledger error: {0}")]
    Sink(#[from] SinkError),

    /// Directory watching error.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning an image file into text.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The file could not be opened or decoded as an image.
    #[error("could not read image {path}: {reason}")]
    UnreadableImage { path: PathBuf, reason: String },

    /// The OCR binary could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The OCR binary ran but reported a failure.
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),
}

/// Errors related to receipt field extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A date pattern matched but does not name a real calendar day.
    #[error("invalid calendar date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Errors raised while appending to the ledger.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors related to directory watching.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Native file system notification failure.
    #[error("notification error: {0}")]
    Notify(#[from] notify::Error),

    /// The directory to watch does not exist.
    #[error("watch directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// Invalid enumeration pattern.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the receipt library.
pub type Result<T> = std::result::Result<T, ReceiptError>;
