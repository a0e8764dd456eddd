//! Rule-based field extractors for Japanese receipts.
//!
//! Each extractor is an ordered [`StrategyChain`]: strategies are tried in
//! priority order and the first one that matches wins.

pub mod amounts;
pub mod dates;
pub mod lines;
pub mod patterns;
pub mod registration;

pub use amounts::{format_yen, normalize_amount, AmountExtractor};
pub use dates::{DateExtractor, DateMatch};
pub use lines::{SummaryExtractor, VendorExtractor};
pub use registration::RegistrationNumberExtractor;

/// OCR text prepared for extraction: the raw text plus its cleaned lines.
#[derive(Debug, Clone)]
pub struct ReceiptText<'a> {
    raw: &'a str,
    lines: Vec<&'a str>,
}

impl<'a> ReceiptText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lines: clean_lines(raw),
        }
    }

    /// The text exactly as the OCR engine produced it.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Trimmed, non-blank lines in original order.
    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }
}

/// Split on every line boundary, trim, and drop blank lines.
pub fn clean_lines(text: &str) -> Vec<&str> {
    text.split(is_line_boundary)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field, or `None` when nothing matches.
    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<Self::Output>>;
}

/// One way of recognizing a field.
pub trait MatchStrategy: Send + Sync {
    type Output;

    /// Short name used in debug logs.
    fn name(&self) -> &'static str;

    /// Try to match against the prepared text.
    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<Self::Output>>;
}

/// Ordered list of strategies; the first success wins.
pub struct StrategyChain<T> {
    strategies: Vec<Box<dyn MatchStrategy<Output = T>>>,
}

impl<T> StrategyChain<T> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a lower-priority strategy.
    pub fn then(mut self, strategy: impl MatchStrategy<Output = T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run strategies in order and return the first match.
    pub fn first_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<T>> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.try_match(text);
            if found.is_some() {
                tracing::trace!("strategy {} matched", strategy.name());
            }
            found
        })
    }
}

impl<T> Default for StrategyChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A matched value together with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range in the raw text, when the match came from a regex.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Parse ASCII or full-width decimal digits.
pub(crate) fn parse_digits(s: &str) -> Option<u32> {
    let mut value: u32 = 0;
    let mut seen = false;

    for c in s.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => return None,
        };
        value = value.checked_mul(10)?.checked_add(digit)?;
        seen = true;
    }

    seen.then_some(value)
}
