//! Date extraction for Japanese receipts.

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::patterns::{DATE_MD, DATE_YMD};
use super::{parse_digits, ExtractionMatch, FieldExtractor, MatchStrategy, ReceiptText, StrategyChain};
use crate::error::ExtractionError;

/// Date components as they appear on the receipt. The year may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl DateMatch {
    /// Build a calendar date, substituting `current_year` when the receipt omits it.
    pub fn resolve(&self, current_year: i32) -> Result<NaiveDate, ExtractionError> {
        let year = self.year.unwrap_or(current_year);
        NaiveDate::from_ymd_opt(year, self.month, self.day).ok_or(ExtractionError::InvalidDate {
            year,
            month: self.month,
            day: self.day,
        })
    }
}

/// `2024年3月15日`, `2024/3/15`, `2024.03.15`.
struct YearMonthDay;

/// `3月15日`.
struct MonthDay;

impl MatchStrategy for YearMonthDay {
    type Output = DateMatch;

    fn name(&self) -> &'static str {
        "year-month-day"
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<DateMatch>> {
        first_date(&DATE_YMD, text.raw())
    }
}

impl MatchStrategy for MonthDay {
    type Output = DateMatch;

    fn name(&self) -> &'static str {
        "month-day"
    }

    fn try_match(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<DateMatch>> {
        first_date(&DATE_MD, text.raw())
    }
}

fn first_date(pattern: &Regex, text: &str) -> Option<ExtractionMatch<DateMatch>> {
    let caps = pattern.captures(text)?;
    let date = date_from_captures(&caps)?;
    let full_match = caps.get(0)?;

    Some(
        ExtractionMatch::new(date, full_match.as_str())
            .with_position(full_match.start(), full_match.end()),
    )
}

fn date_from_captures(caps: &Captures<'_>) -> Option<DateMatch> {
    let year = match caps.name("year") {
        Some(m) => Some(parse_digits(m.as_str())? as i32),
        None => None,
    };

    Some(DateMatch {
        year,
        month: parse_digits(caps.name("month")?.as_str())?,
        day: parse_digits(caps.name("day")?.as_str())?,
    })
}

/// Date field extractor: full dates take priority over month/day only.
pub struct DateExtractor {
    chain: StrategyChain<DateMatch>,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new().then(YearMonthDay).then(MonthDay),
        }
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = DateMatch;

    fn extract(&self, text: &ReceiptText<'_>) -> Option<ExtractionMatch<DateMatch>> {
        self.chain.first_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<DateMatch> {
        DateExtractor::new()
            .extract(&ReceiptText::new(text))
            .map(|m| m.value)
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_extract_kanji_date() {
        let date = extract("ご来店ありがとうございます 2024年3月15日(金) 12:30").unwrap();
        assert_eq!(date.resolve(1999), Ok(ymd(2024, 3, 15)));
    }

    #[test]
    fn test_extract_slash_and_dot_dates() {
        assert_eq!(extract("2023/12/01").unwrap().resolve(2000), Ok(ymd(2023, 12, 1)));
        assert_eq!(extract("発行日 2023.1.9").unwrap().resolve(2000), Ok(ymd(2023, 1, 9)));
    }

    #[test]
    fn test_extract_full_width_digits() {
        let date = extract("２０２４年１２月３１日").unwrap();
        assert_eq!(date.resolve(2000), Ok(ymd(2024, 12, 31)));
    }

    #[test]
    fn test_month_day_uses_current_year() {
        let date = extract("5月20日 お買上げ").unwrap();
        assert_eq!(date.year, None);
        assert_eq!(date.resolve(2031), Ok(ymd(2031, 5, 20)));
    }

    #[test]
    fn test_full_date_beats_earlier_month_day() {
        let text = "予約 4月1日\n領収日 2024年3月15日";
        let found = DateExtractor::new().extract(&ReceiptText::new(text)).unwrap();

        assert_eq!(found.value.resolve(2000), Ok(ymd(2024, 3, 15)));
        assert_eq!(found.source, "2024年3月15日");
    }

    #[test]
    fn test_first_full_date_wins() {
        let date = extract("2024/01/05\n2024/02/06").unwrap();
        assert_eq!(date.resolve(2000), Ok(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_year_outside_2000s_is_not_a_full_date() {
        assert!(extract("1999/01/05").is_none());
    }

    #[test]
    fn test_no_date() {
        assert!(extract("合計 1,500円").is_none());
        assert!(extract("").is_none());
    }

    #[test]
    fn test_invalid_calendar_date() {
        let date = extract("2024年4月31日").unwrap();
        assert_eq!(
            date.resolve(2000),
            Err(ExtractionError::InvalidDate {
                year: 2024,
                month: 4,
                day: 31
            })
        );
    }

    #[test]
    fn test_leap_day_depends_on_substituted_year() {
        let date = extract("2月29日").unwrap();
        assert_eq!(date.resolve(2028), Ok(ymd(2028, 2, 29)));
        assert!(date.resolve(2027).is_err());
    }
}
