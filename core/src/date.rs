//! Civil-date helpers.
//!
//! "Today" is always taken in Asia/Tokyo, which is a fixed UTC+09:00 offset
//! (Japan has no daylight saving time). Day differences are computed on
//! `NaiveDate` values only, so time of day never leaks into the counts.

use chrono::{Datelike, FixedOffset, NaiveDate, Offset, SecondsFormat, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TOKYO_UTC_OFFSET_SECS: i32 = 9 * 3600;

const WEEKDAYS_JA: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(TOKYO_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&tokyo()).date_naive()
}

/// Today as `YYYY-MM-DD`.
#[must_use]
pub fn today_string() -> String {
    today().format(DATE_FORMAT).to_string()
}

/// Current instant as RFC 3339 with milliseconds, in the +09:00 offset.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now()
        .with_timezone(&tokyo())
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[must_use]
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return None,
    };
    Some(days)
}

#[must_use]
pub fn is_valid_date(year: i32, month: u32, day: u32) -> bool {
    days_in_month(year, month).is_some_and(|max| day >= 1 && day <= max)
}

/// Strict `YYYY-MM-DD` check: exactly four, two and two ASCII digits, and a
/// day that exists in that month.
#[must_use]
pub fn is_valid_date_string(s: &str) -> bool {
    split_date(s).is_some_and(|(y, m, d)| is_valid_date(y, m, d))
}

fn split_date(s: &str) -> Option<(i32, u32, u32)> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        b[range.clone()]
            .iter()
            .all(u8::is_ascii_digit)
            .then(|| s[range].parse().ok())
            .flatten()
    };
    let year = i32::try_from(digits(0..4)?).ok()?;
    Some((year, digits(5..7)?, digits(8..10)?))
}

/// Parse a strict `YYYY-MM-DD` string.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let (y, m, d) = split_date(s)?;
    if !is_valid_date(y, m, d) {
        return None;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

#[must_use]
pub fn remaining_days(target: NaiveDate) -> i64 {
    remaining_days_on(today(), target)
}

/// `target - today` in calendar days. Zero or negative means expired.
#[must_use]
pub fn remaining_days_on(today: NaiveDate, target: NaiveDate) -> i64 {
    (target - today).num_days()
}

#[must_use]
pub fn elapsed_days(start: NaiveDate) -> i64 {
    elapsed_days_on(today(), start)
}

#[must_use]
pub fn elapsed_days_on(today: NaiveDate, start: NaiveDate) -> i64 {
    (today - start).num_days().max(0)
}

#[must_use]
pub fn progress(start: NaiveDate, target: NaiveDate) -> f64 {
    progress_on(today(), start, target)
}

/// Percentage of the span `start..target` already lived, in `[0, 100]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_on(today: NaiveDate, start: NaiveDate, target: NaiveDate) -> f64 {
    let elapsed = elapsed_days_on(today, start);
    let total = elapsed + remaining_days_on(today, target);
    if total <= 0 {
        return 0.0;
    }
    (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// `2025年1月1日（水）`
#[must_use]
pub fn format_for_display(date: NaiveDate) -> String {
    let weekday = WEEKDAYS_JA[date.weekday().num_days_from_sunday() as usize];
    format!(
        "{}年{}月{}日（{weekday}）",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Like [`format_for_display`], falling back to the raw text when it is not a date.
#[must_use]
pub fn format_str_for_display(date: &str) -> String {
    parse_date(date).map_or_else(|| date.to_string(), format_for_display)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_remaining_days() {
        assert_eq!(remaining_days_on(d("2024-12-31"), d("2025-01-01")), 1);
        assert_eq!(remaining_days_on(d("2025-01-01"), d("2025-01-01")), 0);
        assert_eq!(remaining_days_on(d("2025-01-03"), d("2025-01-01")), -2);
    }

    #[test]
    fn test_remaining_days_across_leap_day() {
        assert_eq!(remaining_days_on(d("2024-02-28"), d("2024-03-01")), 2);
        assert_eq!(remaining_days_on(d("2023-02-28"), d("2023-03-01")), 1);
    }

    #[test]
    fn test_elapsed_days_never_negative() {
        assert_eq!(elapsed_days_on(d("2024-01-10"), d("2024-01-01")), 9);
        assert_eq!(elapsed_days_on(d("2024-01-01"), d("2024-01-10")), 0);
    }

    #[test]
    fn test_progress() {
        let p = progress_on(d("2024-01-06"), d("2024-01-01"), d("2024-01-11"));
        assert!((p - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_clamped_and_zero_denominator() {
        // target already passed: elapsed 10, remaining -20
        assert!(progress_on(d("2024-01-11"), d("2024-01-01"), d("2023-12-22")).abs() < f64::EPSILON);
        // start == target == today
        assert!(progress_on(d("2024-01-01"), d("2024-01-01"), d("2024-01-01")).abs() < f64::EPSILON);
        // target reached exactly
        let p = progress_on(d("2024-01-11"), d("2024-01-01"), d("2024-01-11"));
        assert!((p - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_valid_date_string() {
        assert!(is_valid_date_string("2024-02-29"));
        assert!(!is_valid_date_string("2023-02-29"));
        assert!(!is_valid_date_string("2024-02-30"));
        assert!(is_valid_date_string("2000-02-29"));
        assert!(!is_valid_date_string("1900-02-29"));
        assert!(!is_valid_date_string("2024-13-01"));
        assert!(!is_valid_date_string("2024-00-10"));
        assert!(!is_valid_date_string("2024-01-00"));
    }

    #[test]
    fn test_is_valid_date_string_rejects_loose_syntax() {
        assert!(!is_valid_date_string("2024-1-05"));
        assert!(!is_valid_date_string("24-01-05"));
        assert!(!is_valid_date_string("2024/01/05"));
        assert!(!is_valid_date_string("2024-01-05T00:00"));
        assert!(!is_valid_date_string("+024-01-05"));
        assert!(!is_valid_date_string(""));
        assert!(!is_valid_date_string("２０２４-01-05"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29"), Some(d("2024-02-29")));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("today"), None);
    }

    #[test]
    fn test_format_for_display() {
        assert_eq!(format_for_display(d("2025-01-01")), "2025年1月1日（水）");
        assert_eq!(format_for_display(d("2024-12-29")), "2024年12月29日（日）");
        assert_eq!(format_str_for_display("garbage"), "garbage");
    }

    #[test]
    fn test_now_timestamp_uses_tokyo_offset() {
        let ts = now_timestamp();
        assert!(ts.ends_with("+09:00"), "unexpected timestamp {ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_today_matches_timestamp_date() {
        let ts = now_timestamp();
        let today = today_string();
        // Could straddle midnight; only compare when the seconds are not at the boundary.
        if !ts[11..].starts_with("23:59:59") {
            assert_eq!(&ts[..10], today);
        }
    }
}
