//! Common regex patterns and keyword sets for Japanese receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // 2024年3月15日, 2024/03/15, 2024.3.15 (trailing 日 optional)
    pub static ref DATE_YMD: Regex = Regex::new(
        r"(?P<year>(?:20|２０)[0-9０-９]{2})[./年](?P<month>[0-9０-９]{1,2})[./月](?P<day>[0-9０-９]{1,2})日?"
    ).unwrap();

    // 3月15日, no year
    pub static ref DATE_MD: Regex = Regex::new(
        r"(?P<month>[0-9０-９]{1,2})月(?P<day>[0-9０-９]{1,2})日"
    ).unwrap();

    // Yen amount, optionally labelled: "合計: 1,500円", "1500 円"
    pub static ref YEN_AMOUNT: Regex = Regex::new(
        r"(?:(?:合計|金額)\s*[:：]?)?\s*(?P<digits>[0-9,]+)\s*円"
    ).unwrap();

    // Qualified invoice issuer registration number
    pub static ref REGISTRATION_NUMBER: Regex = Regex::new(
        r"T[0-9]{2}-[0-9]{6}-[0-9]{5}"
    ).unwrap();
}

/// Currency symbol prefixed to normalized totals.
pub const YEN_SIGN: char = '¥';

/// Legal-entity suffixes and shop words that mark the issuing business.
pub const VENDOR_KEYWORDS: &[&str] = &[
    "株式会社",
    "有限会社",
    "合同会社",
    "店",
    "ショップ",
    "センター",
];

/// Words that introduce the itemization or category line.
pub const SUMMARY_KEYWORDS: &[&str] = &["内訳", "摘要", "品目", "サービス"];
