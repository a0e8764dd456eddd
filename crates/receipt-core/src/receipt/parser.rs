//! Rule-based receipt parser turning OCR text into a [`ReceiptRecord`].

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, warn};

use crate::models::record::{ReceiptRecord, INVOICE_NUMBER_SENTINEL};

use super::rules::{
    AmountExtractor, DateExtractor, FieldExtractor, ReceiptText, RegistrationNumberExtractor,
    SummaryExtractor, VendorExtractor,
};

/// Result of parsing one receipt.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Parsed record.
    pub record: ReceiptRecord,
    /// Raw OCR text the record was parsed from.
    pub raw_text: String,
    /// Problems that were recovered from, e.g. an impossible calendar date.
    pub warnings: Vec<String>,
}

/// Trait for receipt parsing.
pub trait ReceiptParser {
    /// Parse a receipt from OCR text. Missing fields are not errors.
    fn parse(&self, text: &str) -> ExtractionResult;
}

/// Parser running the five field extractors independently over the same text.
pub struct RuleBasedParser {
    dates: DateExtractor,
    amounts: AmountExtractor,
    registration: RegistrationNumberExtractor,
    vendors: VendorExtractor,
    summaries: SummaryExtractor,
    /// Fixed "today" used for receipts without a year; the local date when unset.
    reference_date: Option<NaiveDate>,
}

impl RuleBasedParser {
    pub fn new() -> Self {
        Self {
            dates: DateExtractor::new(),
            amounts: AmountExtractor::new(),
            registration: RegistrationNumberExtractor::new(),
            vendors: VendorExtractor::new(),
            summaries: SummaryExtractor::new(),
            reference_date: None,
        }
    }

    /// Pin the date used to fill in a missing year.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn current_year(&self) -> i32 {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
            .year()
    }

    fn extract_date(&self, text: &ReceiptText<'_>, warnings: &mut Vec<String>) -> String {
        let Some(found) = self.dates.extract(text) else {
            return String::new();
        };

        match found.value.resolve(self.current_year()) {
            Ok(date) => date.format("%Y-%m-%d").to_string(),
            Err(e) => {
                let warning = match found.position {
                    Some((start, _)) => format!("{} (matched {:?} at byte {})", e, found.source, start),
                    None => format!("{} (matched {:?})", e, found.source),
                };
                warn!("Ignoring date: {}", warning);
                warnings.push(warning);
                String::new()
            }
        }
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for RuleBasedParser {
    fn parse(&self, text: &str) -> ExtractionResult {
        let receipt = ReceiptText::new(text);
        let mut warnings = Vec::new();

        let date = self.extract_date(&receipt, &mut warnings);
        let total_amount = self
            .amounts
            .extract(&receipt)
            .map(|m| m.value)
            .unwrap_or_default();
        let invoice_number = self
            .registration
            .extract(&receipt)
            .map(|m| m.value)
            .unwrap_or_else(|| INVOICE_NUMBER_SENTINEL.to_string());
        let vendor = self
            .vendors
            .extract(&receipt)
            .map(|m| m.value)
            .unwrap_or_default();
        let summary = self
            .summaries
            .extract(&receipt)
            .map(|m| m.value)
            .unwrap_or_default();

        debug!(
            "Parsed {} lines: date={:?} vendor={:?} total={:?} invoice={:?}",
            receipt.lines().len(),
            date,
            vendor,
            total_amount,
            invoice_number
        );

        ExtractionResult {
            record: ReceiptRecord::new(date, vendor, summary, total_amount, invoice_number),
            raw_text: text.to_string(),
            warnings,
        }
    }
}

/// Parse OCR text with the default rules and today's date.
pub fn parse_receipt_text(text: &str) -> ReceiptRecord {
    RuleBasedParser::new().parse(text).record
}
