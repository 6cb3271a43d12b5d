//! Timestamp extraction from raw log lines.
//!
//! Two shapes are recognised:
//!
//! | Shape | Example | Interpretation |
//! |-------|---------|----------------|
//! | Leading ISO-like | `2024-01-01 10:00:00.123 msg` | UTC, fraction padded/truncated to µs |
//! | Bracketed access-log | `... [15/Jan/2024:10:00:00 +0100] ...` | offset applied, UTC |
//!
//! Anything else, including lines that only superficially match (month 13,
//! hour 25), yields `None`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use regex::Regex;

use crate::types::SourceKind;

static LEADING_TS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})(?:[.,](\d{1,6}))?")
        .expect("leading timestamp pattern must compile")
});

static BRACKETED_TS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2}) ([+-]\d{4})\]")
        .expect("bracketed timestamp pattern must compile")
});

/// Extract the timestamp a line carries, if any.
///
/// Web-access sources try the bracketed form first; all other sources try the
/// leading form first. Either way both forms are attempted.
pub fn extract(line: &str, kind: SourceKind) -> Option<DateTime<Utc>> {
    match kind {
        SourceKind::Generic => leading(line).or_else(|| bracketed(line)),
        SourceKind::WebAccess => bracketed(line).or_else(|| leading(line)),
    }
}

fn leading(line: &str) -> Option<DateTime<Utc>> {
    let caps = LEADING_TS.captures(line)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[2], "%H:%M:%S").ok()?;
    let mut ts = NaiveDateTime::new(date, time);

    if let Some(frac) = caps.get(3) {
        let micros: u32 = format!("{:0<6}", frac.as_str()).parse().ok()?;
        ts = ts.with_nanosecond(micros * 1_000)?;
    }

    Some(ts.and_utc())
}

fn bracketed(line: &str) -> Option<DateTime<Utc>> {
    let caps = BRACKETED_TS.captures(line)?;
    let raw = format!("{} {}", &caps[1], &caps[2]);
    DateTime::parse_from_str(&raw, "%d/%b/%Y:%H:%M:%S %z")
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
