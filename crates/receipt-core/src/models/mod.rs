//! Data models for receipts and scanner configuration.

pub mod config;
pub mod record;

pub use config::{OcrConfig, ScannerConfig, WatchMode};
pub use record::{ReceiptRecord, INVOICE_NUMBER_SENTINEL, LEDGER_HEADERS};
