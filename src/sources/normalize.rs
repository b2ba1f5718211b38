//! Field normalization shared by the storefront adapters

use crate::ExtractionFailure;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

/// Where a description is cut to keep its first segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// First line
    Line,
    /// First line, then up to the first period
    LineOrSentence,
}

/// How a storefront writes publication dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGrammar {
    /// `2021-03-04`, possibly followed by a time part
    Iso,
    /// `2019` (meaning January 1st) or `2019-05-14`
    YearOrIso,
    /// `04 / 03 / 2021`
    SlashDayMonthYear,
    /// `4th March, 2021`
    OrdinalDayMonthYear,
    /// `Published: Mar 04, 2021`
    PublishedMonthDayYear,
}

impl DateGrammar {
    /// Parses `raw` under this grammar
    pub fn parse(&self, field: &'static str, raw: &str) -> Result<NaiveDate, ExtractionFailure> {
        let value = raw.trim();
        let fail = |reason: String| ExtractionFailure::Unparsable {
            field,
            value: raw.to_string(),
            reason,
        };

        match self {
            Self::Iso => {
                let prefix = value
                    .get(..10)
                    .ok_or_else(|| fail("shorter than an ISO date".to_string()))?;
                NaiveDate::parse_from_str(prefix, "%Y-%m-%d").map_err(|e| fail(e.to_string()))
            }
            Self::YearOrIso => {
                if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
                    let year = value.parse::<i32>().map_err(|e| fail(e.to_string()))?;
                    NaiveDate::from_ymd_opt(year, 1, 1)
                        .ok_or_else(|| fail("year out of range".to_string()))
                } else {
                    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| fail(e.to_string()))
                }
            }
            Self::SlashDayMonthYear => {
                NaiveDate::parse_from_str(value, "%d / %m / %Y").map_err(|e| fail(e.to_string()))
            }
            Self::OrdinalDayMonthYear => {
                let plain = match ordinal_suffix() {
                    Some(re) => re.replace_all(value, "$1").into_owned(),
                    None => value.to_string(),
                };
                NaiveDate::parse_from_str(&plain, "%d %B, %Y").map_err(|e| fail(e.to_string()))
            }
            Self::PublishedMonthDayYear => {
                let plain = value.strip_prefix("Published:").unwrap_or(value).trim();
                NaiveDate::parse_from_str(plain, "%b %d, %Y").map_err(|e| fail(e.to_string()))
            }
        }
    }
}

fn ordinal_suffix() -> Option<&'static Regex> {
    static ORDINAL: OnceLock<Option<Regex>> = OnceLock::new();
    ORDINAL
        .get_or_init(|| Regex::new(r"(\d+)(st|nd|rd|th)\b").ok())
        .as_ref()
}

/// Removes every occurrence of the given phrases and tidies the whitespace left behind
pub fn strip_boilerplate(value: &str, phrases: &[&str]) -> String {
    let mut cleaned = value.to_string();
    for phrase in phrases {
        cleaned = cleaned.replace(phrase, "");
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first segment of a description
pub fn first_segment(text: &str, boundary: Boundary) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    match boundary {
        Boundary::Line => line.to_string(),
        Boundary::LineOrSentence => line.split('.').next().unwrap_or("").trim().to_string(),
    }
}

fn price_run() -> Option<&'static Regex> {
    static PRICE: OnceLock<Option<Regex>> = OnceLock::new();
    PRICE
        .get_or_init(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)*").ok())
        .as_ref()
}

/// Parses a displayed price such as `£1,299.00` into a decimal
///
/// Only the first number in `raw` is read, so currency symbols, thousands
/// separators and trailing text such as a second `RRP` price are dropped.
pub fn parse_price(field: &'static str, raw: &str) -> Result<Decimal, ExtractionFailure> {
    let fail = |reason: String| ExtractionFailure::Unparsable {
        field,
        value: raw.to_string(),
        reason,
    };

    let run = price_run()
        .ok_or_else(|| fail("price pattern unavailable".to_string()))?
        .find(raw)
        .ok_or_else(|| fail("no digits".to_string()))?;

    let digits = run.as_str().replace(',', "");
    Decimal::from_str(&digits).map_err(|e| fail(e.to_string()))
}
