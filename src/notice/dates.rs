//! Timestamp parsing for notice dates.
//!
//! Notices carry local dates and times with optional offsets (`2025-03-01+01:00`,
//! `12:00:00Z`). Offsets are dropped and the wall-clock value is taken as UTC.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

use super::schema::DeadlinePeriod;

/// Horizon used when a notice has no parseable submission deadline.
pub(crate) const DEADLINE_FALLBACK: Duration = Duration::days(14);

const END_OF_DAY: &str = "23:59:59";

const DATETIME_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATETIME_MINUTES: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Remove a trailing `Z`, `±hh:mm` or `±hhmm` offset.
///
/// The offset is recognised by position so the dashes of a bare date are left alone.
pub(crate) fn strip_timezone(value: &str) -> &str {
    let value = value.trim();
    if let Some(rest) = value.strip_suffix(['Z', 'z']) {
        return rest;
    }

    let bytes = value.as_bytes();
    let is_sign = |byte: u8| byte == b'+' || byte == b'-';
    let digits = |range: &[u8]| range.iter().all(u8::is_ascii_digit);

    let len = bytes.len();
    if len > 6 {
        let tail = &bytes[len - 6..];
        if is_sign(tail[0]) && digits(&tail[1..3]) && tail[3] == b':' && digits(&tail[4..]) {
            return &value[..len - 6];
        }
    }
    if len > 5 {
        let tail = &bytes[len - 5..];
        if is_sign(tail[0]) && digits(&tail[1..]) && bytes[len - 6].is_ascii_digit() {
            return &value[..len - 5];
        }
    }
    value
}

/// Resolve the submission deadline, falling back to `now + 14 days`.
///
/// Formats are tried in order: date-time with seconds, date-time without seconds, then the
/// bare date at midnight. A missing end time means the end of that day.
pub(crate) fn resolve_deadline(
    period: Option<&DeadlinePeriod>,
    now: OffsetDateTime,
) -> OffsetDateTime {
    period
        .and_then(parse_deadline_period)
        .unwrap_or(now + DEADLINE_FALLBACK)
}

fn parse_deadline_period(period: &DeadlinePeriod) -> Option<OffsetDateTime> {
    let date = strip_timezone(&period.end_date);
    if date.is_empty() {
        return None;
    }
    let time = match strip_timezone(&period.end_time) {
        "" => END_OF_DAY,
        time => time,
    };

    let combined = format!("{date}T{time}");
    [DATETIME_SECONDS, DATETIME_MINUTES]
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(&combined, format).ok())
        .or_else(|| Date::parse(date, DATE_ONLY).ok().map(Date::midnight))
        .map(PrimitiveDateTime::assume_utc)
}

/// Parse the publication date; absent or unparsable values yield `None`.
pub(crate) fn parse_published(issue_date: &str) -> Option<OffsetDateTime> {
    let value = strip_timezone(issue_date);
    if value.is_empty() {
        return None;
    }
    Date::parse(value, DATE_ONLY)
        .map(Date::midnight)
        .or_else(|_| PrimitiveDateTime::parse(value, DATETIME_SECONDS))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
