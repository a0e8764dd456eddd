//! Directory watching and the receipt processing loop.

mod files;
mod native;
mod polling;
mod scanner;
mod source;

pub use files::{enumerate_files, enumerate_receipts};
pub use native::NativeSource;
pub use polling::PollingSource;
pub use scanner::{BatchSummary, FileOutcome, ReceiptScanner, SkipReason};
pub use source::{select_change_source, ChangeSource};
