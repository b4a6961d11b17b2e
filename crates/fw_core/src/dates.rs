//! Normalization of the free-form date strings found on listing pages and feeds.
//!
//! Every input maps to a calendar date. Inputs that carry no usable date fall back
//! to the request day and are marked [`DateConfidence::Inferred`] so callers can
//! tell them apart from articles that really are from today.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::DateConfidence;

lazy_static! {
    static ref DAYS_AGO: Regex = Regex::new(r"(?i)(\d+)\s+days?\s+ago").unwrap();
    static ref HOURS_AGO: Regex = Regex::new(r"(?i)(\d+)\s+hours?\s+ago").unwrap();
    static ref WEEKDAY_PREFIX: Regex =
        Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").unwrap();
    static ref ORDINAL_SUFFIX: Regex = Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap();
    static ref TRAILING_TIME: Regex = Regex::new(r"^\s*[,|T]?\s*\d{1,2}:\d{2}").unwrap();
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%b-%Y",
];

/// A calendar date plus how it was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    pub confidence: DateConfidence,
}

impl NormalizedDate {
    fn exact(date: NaiveDate) -> Self {
        Self {
            date,
            confidence: DateConfidence::Exact,
        }
    }

    fn inferred(date: NaiveDate) -> Self {
        Self {
            date,
            confidence: DateConfidence::Inferred,
        }
    }
}

/// The current UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Normalizes against the current UTC day.
pub fn normalize(text: Option<&str>) -> NormalizedDate {
    normalize_at(text, today())
}

/// Normalizes `text` relative to `today`. Never fails.
pub fn normalize_at(text: Option<&str>, today: NaiveDate) -> NormalizedDate {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return NormalizedDate::inferred(today),
    };

    if let Some(caps) = DAYS_AGO.captures(text) {
        if let Ok(days) = caps[1].parse::<i64>() {
            if let Some(date) = Duration::try_days(days).and_then(|d| today.checked_sub_signed(d)) {
                return NormalizedDate::exact(date);
            }
        }
    }

    let lower = text.to_lowercase();
    if HOURS_AGO.is_match(text) || lower.contains("today") {
        return NormalizedDate::exact(today);
    }
    if lower.contains("yesterday") {
        return NormalizedDate::exact(today - Duration::days(1));
    }

    match parse_calendar_date(text) {
        Some(date) => NormalizedDate::exact(date),
        None => NormalizedDate::inferred(today),
    }
}

/// Generic calendar parse of a whole date expression.
///
/// Zoned timestamps are converted to UTC before taking the day.
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }

    let cleaned = WEEKDAY_PREFIX.replace(text, "");
    let cleaned = ORDINAL_SUFFIX.replace_all(&cleaned, "$1");
    let cleaned = cleaned.trim();

    for fmt in DATE_FORMATS {
        if let Ok((date, rest)) = NaiveDate::parse_and_remainder(cleaned, fmt) {
            // allow a trailing time ("10:30 GMT", "T08:00") but not arbitrary text
            if rest.trim().is_empty() || TRAILING_TIME.is_match(rest) {
                return Some(date);
            }
        }
    }

    None
}
