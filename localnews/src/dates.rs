//! Heuristic resolution of publication dates ("3 days ago", "Yesterday", RFC 3339, ...).
//!
//! Two entry points share one parser but disagree on failure:
//! [`coerce_published_date`] yields `None`, [`resolve_page_age`] yields the current time.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum DateParseError {
    #[error("no leading count in relative date '{0}'")]
    BadCount(String),
    #[error("relative date '{0}' is out of range")]
    Overflow(String),
    #[error("unrecognised date format '{0}'")]
    Unrecognised(String),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%b %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"];

/// Parse `text` relative to `now`. Relative phrases win over absolute formats.
pub fn parse_date_expression(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DateParseError> {
    let lower = text.trim().to_lowercase();

    let relative: [(&str, fn(i64) -> Option<Duration>); 3] = [
        ("days ago", Duration::try_days),
        ("hours ago", Duration::try_hours),
        ("minutes ago", Duration::try_minutes),
    ];
    for (phrase, unit) in relative {
        if lower.contains(phrase) {
            let count: i64 = lower
                .split_whitespace()
                .next()
                .and_then(|tok| tok.parse().ok())
                .ok_or_else(|| DateParseError::BadCount(text.to_string()))?;
            return unit(count)
                .and_then(|d| now.checked_sub_signed(d))
                .ok_or_else(|| DateParseError::Overflow(text.to_string()));
        }
    }

    if lower.contains("yesterday") {
        return Ok(now - Duration::days(1));
    }

    parse_absolute(text.trim()).ok_or_else(|| DateParseError::Unrecognised(text.to_string()))
}

/// Free-form absolute dates. Values without an offset are taken as UTC.
fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Coercion used when an article is built from client-facing data.
pub fn coerce_published_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let text = value.filter(|v| !v.is_empty())?;
    parse_date_expression(text, Utc::now()).ok()
}

/// Resolution of a search result's page age while articles are being assembled.
/// Unparsable text falls back to the current time.
pub fn resolve_page_age(value: Option<&str>) -> Option<DateTime<Utc>> {
    let text = value.filter(|v| !v.is_empty())?;
    let now = Utc::now();
    match parse_date_expression(text, now) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("Could not parse date string: '{}'. Error: {}", text, e);
            Some(now)
        }
    }
}
