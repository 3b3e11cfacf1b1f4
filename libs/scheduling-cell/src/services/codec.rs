// libs/scheduling-cell/src/services/codec.rs
//
// Conversions between what the user types (dd/mm/yyyy, HH:mm) and the
// canonical forms. Everything here is string work: no timezone, no offset,
// no calendar arithmetic.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::{CalendarDate, ClockTime, LocalTimestamp};

static DISPLAY_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("display date pattern is valid"));

static DISPLAY_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}):(\d{2})$").expect("display time pattern is valid"));

static CANONICAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("canonical date pattern is valid"));

static CANONICAL_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2}))?$").expect("canonical time pattern is valid"));

static LOCAL_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})T(\d{2}:\d{2})(?::(\d{2})(?:\.\d{1,9})?)?$")
        .expect("local timestamp pattern is valid")
});

fn number<T: std::str::FromStr>(caps: &regex::Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

// ==============================================================================
// DISPLAY FORMS
// ==============================================================================

/// `dd/mm/yyyy` → date. Range checks only: `31/02/2025` is accepted.
pub fn parse_display_date(text: &str) -> Option<CalendarDate> {
    let caps = DISPLAY_DATE.captures(text)?;
    CalendarDate::new(number(&caps, 3)?, number(&caps, 2)?, number(&caps, 1)?)
}

pub fn format_calendar_date_to_display(date: &CalendarDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}

/// `HH:mm` → time, hour 0-23 and minute 0-59.
pub fn parse_display_time(text: &str) -> Option<ClockTime> {
    let caps = DISPLAY_TIME.captures(text)?;
    ClockTime::new(number(&caps, 1)?, number(&caps, 2)?)
}

pub fn format_clock_time_to_display(time: &ClockTime) -> String {
    time.to_string()
}

/// `dd/mm/yyyy HH:mm`, as appointment listings show it.
pub fn format_timestamp_to_display(timestamp: &LocalTimestamp) -> String {
    format!(
        "{} {}",
        format_calendar_date_to_display(&timestamp.date()),
        format_clock_time_to_display(&timestamp.time())
    )
}

// ==============================================================================
// CANONICAL FORMS
// ==============================================================================

pub fn parse_canonical_date(text: &str) -> Option<CalendarDate> {
    let caps = CANONICAL_DATE.captures(text)?;
    CalendarDate::new(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?)
}

/// `HH:mm` or `HH:mm:ss`; seconds are dropped.
pub fn parse_canonical_time(text: &str) -> Option<ClockTime> {
    let caps = CANONICAL_TIME.captures(text.trim())?;
    if let Some(second) = caps.get(3) {
        if second.as_str().parse::<u32>().ok()? > 59 {
            return None;
        }
    }
    ClockTime::new(number(&caps, 1)?, number(&caps, 2)?)
}

/// Accepts `YYYY-MM-DDTHH:mm`, `YYYY-MM-DDTHH:mm:ss` and a trailing fraction,
/// which is truncated. The result is re-emitted in canonical form.
pub fn parse_local_timestamp(text: &str) -> Option<LocalTimestamp> {
    let caps = LOCAL_TIMESTAMP.captures(text.trim())?;
    let date = parse_canonical_date(caps.get(1)?.as_str())?;
    let time = parse_canonical_time(caps.get(2)?.as_str())?;
    let second = match caps.get(3) {
        Some(raw) => raw.as_str().parse::<u32>().ok().filter(|s| *s <= 59)?,
        None => 0,
    };

    Some(build_timestamp(date, time, second))
}

fn build_timestamp(date: CalendarDate, time: ClockTime, second: u32) -> LocalTimestamp {
    if !date.is_calendar_valid() {
        warn!("Combining timestamp on a day that does not exist: {}", date);
    }
    let text = format!("{}T{}:{:02}", date, time, second);
    LocalTimestamp::from_parts(text, date, time, second)
}

/// Date + time → `YYYY-MM-DDTHH:mm:00`. `None` if either side is missing.
pub fn combine_local_timestamp(
    date: Option<&CalendarDate>,
    time: Option<&ClockTime>,
) -> Option<LocalTimestamp> {
    Some(build_timestamp(*date?, *time?, 0))
}

/// Text variant used at the edges: the date must be `YYYY-MM-DD`, the time
/// `HH:mm` (seconds become `00`) or `HH:mm:ss` (kept as given). Anything else,
/// or an empty side, yields `None`.
pub fn combine_local_timestamp_text(date_text: &str, time_text: &str) -> Option<LocalTimestamp> {
    let date_text = date_text.trim();
    let time_text = time_text.trim();
    if date_text.is_empty() || time_text.is_empty() {
        return None;
    }

    let date = parse_canonical_date(date_text)?;
    let caps = CANONICAL_TIME.captures(time_text)?;
    let time = ClockTime::new(number(&caps, 1)?, number(&caps, 2)?)?;
    let second = match caps.get(3) {
        Some(raw) => raw.as_str().parse::<u32>().ok().filter(|s| *s <= 59)?,
        None => 0,
    };

    Some(build_timestamp(date, time, second))
}
