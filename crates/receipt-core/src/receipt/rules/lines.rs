//! Line-based extraction: vendor and summary.

use super::patterns::{SUMMARY_KEYWORDS, VENDOR_KEYWORDS};
use super::{ExtractionMatch, FieldExtractor, MatchStrategy, ReceiptText, StrategyChain};

/// First cleaned line containing any of the keywords.
struct KeywordLine {
    name: &'static str,
    keywords: &'static [&'static str],
}

impl MatchStrategy for KeywordLine {
    type Output = String;

    fn name(&self) -> &'static str {
        self.name
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        text.lines()
            .iter()
            .find(|line| self.keywords.iter().any(|keyword| line.contains(keyword)))
            .map(|line| ExtractionMatch::new(line.to_string(), *line))
    }
}

/// The first cleaned line, whatever it says.
struct FirstLine;

impl MatchStrategy for FirstLine {
    type Output = String;

    fn name(&self) -> &'static str {
        "first-line"
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        text.lines()
            .first()
            .map(|line| ExtractionMatch::new(line.to_string(), *line))
    }
}

/// Vendor extractor: a line naming a business entity, else the receipt's first line.
pub struct VendorExtractor {
    chain: StrategyChain<String>,
}

impl VendorExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .then(KeywordLine {
                    name: "vendor-keyword",
                    keywords: VENDOR_KEYWORDS,
                })
                .then(FirstLine),
        }
    }
}

impl Default for VendorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VendorExtractor {
    type Output = String;

    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        self.chain.first_match(text)
    }
}

/// Summary extractor: a line introducing the breakdown or item. No fallback.
pub struct SummaryExtractor {
    chain: StrategyChain<String>,
}

impl SummaryExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new().then(KeywordLine {
                name: "summary-keyword",
                keywords: SUMMARY_KEYWORDS,
            }),
        }
    }
}

impl Default for SummaryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for SummaryExtractor {
    type Output = String;

    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        self.chain.first_match(text)
    }
}
