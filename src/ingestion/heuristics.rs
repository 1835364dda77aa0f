//! Title and deadline guesses for transcribed scans.

use std::sync::LazyLock;

use regex::Regex;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

/// Title used when no line looks like one.
pub const UNTITLED_SCAN: &str = "Untitled tender (OCR)";

/// Horizon applied when the text carries no readable date.
pub const SCAN_DEADLINE_FALLBACK: Duration = Duration::days(28);

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}\.\d{2}\.\d{4}|\d{4}-\d{2}-\d{2})\b").expect("valid date pattern")
});

/// First line whose trimmed length is strictly between 10 and 100 characters.
pub fn extract_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| {
            let chars = line.chars().count();
            chars > 10 && chars < 100
        })
        .map_or_else(|| UNTITLED_SCAN.to_string(), str::to_string)
}

/// First `DD.MM.YYYY` or `YYYY-MM-DD` date in the text at midnight UTC, else `now + 28 days`.
pub fn extract_deadline(text: &str, now: OffsetDateTime) -> OffsetDateTime {
    DATE_PATTERN
        .find(text)
        .and_then(|found| parse_date(found.as_str()))
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
        .unwrap_or(now + SCAN_DEADLINE_FALLBACK)
}

fn parse_date(raw: &str) -> Option<Date> {
    let format = if raw.contains('.') {
        format_description!("[day].[month].[year]")
    } else {
        format_description!("[year]-[month]-[day]")
    };
    Date::parse(raw, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn title_is_first_line_of_plausible_length() {
        let text = "Seite 1\n\n   Straßenbauarbeiten Gemeinde Nord  \nFrist: 15.06.2025";
        assert_eq!(extract_title(text), "Straßenbauarbeiten Gemeinde Nord");
    }

    #[test]
    fn title_bounds_are_exclusive() {
        let ten = "a".repeat(10);
        let eleven = "b".repeat(11);
        let hundred = "c".repeat(100);
        assert_eq!(extract_title(&format!("{ten}\n{hundred}")), UNTITLED_SCAN);
        assert_eq!(extract_title(&format!("{ten}\n{eleven}")), eleven);
        // umlauts count as one character each
        assert_eq!(extract_title("ääääääääää"), UNTITLED_SCAN);
    }

    #[test]
    fn ninety_nine_character_lines_are_titles() {
        let ninety_nine = "d".repeat(99);
        assert_eq!(extract_title(&format!("{}\n{ninety_nine}", "e".repeat(100))), ninety_nine);

        let umlauts = "ö".repeat(99);
        assert_eq!(extract_title(&umlauts), umlauts);
    }

    #[test]
    fn deadline_reads_german_and_iso_dates() {
        let now = datetime!(2025-01-01 10:00 UTC);
        assert_eq!(
            extract_deadline("Angebotsfrist 15.06.2025 12 Uhr", now),
            datetime!(2025-06-15 0:00 UTC)
        );
        assert_eq!(
            extract_deadline("Abgabe bis 2025-07-01", now),
            datetime!(2025-07-01 0:00 UTC)
        );
    }

    #[test]
    fn deadline_falls_back_to_four_weeks() {
        let now = datetime!(2025-01-01 10:00 UTC);
        assert_eq!(extract_deadline("keine Frist", now), now + Duration::days(28));
        // matches the pattern but is not a calendar date
        assert_eq!(extract_deadline("am 31.02.2025", now), now + Duration::days(28));
    }
}
