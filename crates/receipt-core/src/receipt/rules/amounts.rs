//! Total amount extraction for Japanese receipts.

use super::patterns::{YEN_AMOUNT, YEN_SIGN};
use super::{ExtractionMatch, FieldExtractor, MatchStrategy, ReceiptText, StrategyChain};

/// Digits (optionally comma-grouped) directly before `円`, with an optional `合計`/`金額` label.
struct YenAmount;

impl MatchStrategy for YenAmount {
    type Output = String;

    fn name(&self) -> &'static str {
        "yen-amount"
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        let caps = YEN_AMOUNT.captures(text.raw())?;
        let digits = caps.name("digits")?;
        let full_match = caps.get(0)?;

        Some(
            ExtractionMatch::new(normalize_amount(digits.as_str()), full_match.as_str().trim())
                .with_position(full_match.start(), full_match.end()),
        )
    }
}

/// Amount field extractor. The value is already normalized (`¥1,234`).
pub struct AmountExtractor {
    chain: StrategyChain<String>,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new().then(YenAmount),
        }
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = String;

    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        self.chain.first_match(text)
    }
}

/// Normalize a matched digit group such as `1,234` or `1234` to `¥1,234`.
///
/// Groups with no digits left after removing commas are returned unchanged.
pub fn normalize_amount(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }

    format_yen(&digits)
}

/// Format a string of ASCII digits as yen with thousands separators.
pub fn format_yen(digits: &str) -> String {
    let significant = digits.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };

    let chars: Vec<char> = significant.chars().collect();
    let mut formatted = String::with_capacity(chars.len() + chars.len() / 3 + 2);
    formatted.push(YEN_SIGN);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    formatted
}
