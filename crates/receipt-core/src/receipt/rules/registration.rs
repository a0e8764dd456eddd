//! Invoice registration number extraction.

use super::patterns::REGISTRATION_NUMBER;
use super::{ExtractionMatch, FieldExtractor, MatchStrategy, ReceiptText, StrategyChain};

/// `T12-345678-90123`.
struct RegistrationCode;

impl MatchStrategy for RegistrationCode {
    type Output = String;

    fn name(&self) -> &'static str {
        "registration-code"
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        let m = REGISTRATION_NUMBER.find(text.raw())?;
        Some(ExtractionMatch::new(m.as_str().to_string(), m.as_str()).with_position(m.start(), m.end()))
    }
}

/// Registration number extractor. Callers substitute the review sentinel on `None`.
pub struct RegistrationNumberExtractor {
    chain: StrategyChain<String>,
}

impl RegistrationNumberExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new().then(RegistrationCode),
        }
    }
}

impl Default for RegistrationNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for RegistrationNumberExtractor {
    type Output = String;

    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<String>> {
        self.chain.first_match(text)
    }
}
