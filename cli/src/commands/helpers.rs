use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use std::io::{self, BufRead, Write};

use memento_core::date::{self, DATE_FORMAT};

/// Resolve a date argument against `today`.
/// Accepts `YYYY-MM-DD` or today/yesterday/tomorrow; `None` means today.
pub(crate) fn resolve_date(date_str: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date_str.map(str::trim) {
        None | Some("today") => Ok(today),
        Some("yesterday") => Ok(today - Duration::days(1)),
        Some("tomorrow") => Ok(today + Duration::days(1)),
        Some(s) => date::parse_date(s).with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

/// [`resolve_date`] against today's date in the journal's timezone, as a string.
pub(crate) fn parse_date(date_str: Option<&str>) -> Result<String> {
    let date = resolve_date(date_str, date::today())?;
    Ok(date.format(DATE_FORMAT).to_string())
}

/// Use `value` when given, otherwise ask for it on stderr and read one line.
pub(crate) fn answer_or_prompt(value: Option<String>, question: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    eprint!("{question}\n> ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

/// Ask a yes/no question; anything but y/yes is no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let Some(line) = stdin.lock().lines().next() else {
        bail!("No input");
    };
    Ok(matches!(line?.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Single-line preview of free text.
pub(crate) fn preview(s: &str, max: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, max)
}
