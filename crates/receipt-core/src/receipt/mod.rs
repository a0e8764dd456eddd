//! Receipt field extraction.

mod parser;
pub mod rules;

pub use parser::{parse_receipt_text, ExtractionResult, ReceiptParser, RuleBasedParser};
