//! Core library for the Japanese receipt scanner.
//!
//! This crate provides:
//! - Image preprocessing and a Tesseract-backed OCR pipeline
//! - Rule-based extraction of receipt fields (date, vendor, total, invoice registration number)
//! - An append-only CSV ledger
//! - Directory watching with native events or polling

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;
pub mod sink;
pub mod watch;

pub use error::{ReceiptError, Result};
pub use models::{OcrConfig, ReceiptRecord, ScannerConfig, WatchMode};
pub use ocr::{ImagePipeline, OcrEngine, TesseractEngine};
pub use receipt::{parse_receipt_text, ExtractionResult, ReceiptParser, RuleBasedParser};
pub use sink::{CsvLedger, RecordSink};
pub use watch::{select_change_source, BatchSummary, ChangeSource, FileOutcome, ReceiptScanner};
