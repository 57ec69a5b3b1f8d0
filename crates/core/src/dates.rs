//! Posted-date parsing across the formats the boards actually emit.
//!
//! Absolute formats range from `19/04/2025` to ISO-8601 with fractional
//! seconds; several boards only give relative text ("Posted today",
//! "3 days ago"). Anything unparseable falls back to `today` so the
//! record still carries a usable date.

use std::sync::OnceLock;

use chrono::{Days, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Date-only formats tried in order.
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d %B %Y"];

/// Datetime formats tried in order; the date part is kept.
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
];

fn days_ago_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+)\s*(?:days?|d)\b").expect("static date regex"))
}

/// Parse a posted-date string, falling back to `today`.
///
/// Handles relative forms first ("today", "yesterday", "N days ago",
/// Glassdoor's "30d+"), then the absolute formats above.
pub fn parse_posted_date(text: &str, today: NaiveDate) -> NaiveDate {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return today;
    }

    let lowered = trimmed.to_lowercase();
    if lowered.contains("today") || lowered.contains("just now") {
        return today;
    }
    if lowered.contains("yesterday") {
        return today.checked_sub_days(Days::new(1)).unwrap_or(today);
    }
    if let Some(caps) = days_ago_pattern().captures(&lowered) {
        if let Ok(days) = caps[1].parse::<u64>() {
            return today.checked_sub_days(Days::new(days)).unwrap_or(today);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date;
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return dt.date();
        }
    }

    today
}
