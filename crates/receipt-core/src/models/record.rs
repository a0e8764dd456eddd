//! The structured receipt produced from OCR text.

use serde::Serialize;

/// Placeholder written when no registration number was found ("needs investigation").
pub const INVOICE_NUMBER_SENTINEL: &str = "要調査";

/// Ledger column labels, in row order.
pub const LEDGER_HEADERS: [&str; 6] = [
    "日付",
    "業者名",
    "内訳概要",
    "合計金額（税込）",
    "インボイス番号",
    "適用",
];

/// One parsed receipt, ready to be appended to the ledger.
///
/// Every field is plain text. An undetected field is an empty string, except
/// `invoice_number`, which falls back to [`INVOICE_NUMBER_SENTINEL`].
/// Records have no identity beyond their values: processing the same image
/// twice yields two equal records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptRecord {
    date: String,
    vendor: String,
    summary: String,
    total_amount: String,
    invoice_number: String,
    notes: String,
}

impl ReceiptRecord {
    /// Build a record with empty notes.
    ///
    /// An empty `invoice_number` is replaced by the sentinel.
    pub fn new(
        date: impl Into<String>,
        vendor: impl Into<String>,
        summary: impl Into<String>,
        total_amount: impl Into<String>,
        invoice_number: impl Into<String>,
    ) -> Self {
        let mut invoice_number = invoice_number.into();
        if invoice_number.is_empty() {
            invoice_number = INVOICE_NUMBER_SENTINEL.to_string();
        }

        Self {
            date: date.into(),
            vendor: vendor.into(),
            summary: summary.into(),
            total_amount: total_amount.into(),
            invoice_number,
            notes: String::new(),
        }
    }

    /// Issue date as `YYYY-MM-DD`, or empty.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Total formatted as `¥1,234`, or empty.
    pub fn total_amount(&self) -> &str {
        &self.total_amount
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    /// Reserved for manual annotation in the ledger; always empty here.
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Whether the invoice number still needs a human to look it up.
    pub fn needs_review(&self) -> bool {
        self.invoice_number == INVOICE_NUMBER_SENTINEL
    }

    /// Field values in ledger column order.
    pub fn to_row(&self) -> [&str; 6] {
        [
            &self.date,
            &self.vendor,
            &self.summary,
            &self.total_amount,
            &self.invoice_number,
            &self.notes,
        ]
    }
}
