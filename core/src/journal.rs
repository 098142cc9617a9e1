use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::adapter::{Backend, StorageAdapter, open_adapter};
use crate::date::{
    DATE_FORMAT, format_for_display, format_str_for_display, is_valid_date_string, parse_date,
    progress_on, remaining_days_on,
};
use crate::error::{Result, StorageError};
use crate::schema::{
    AppData, DayRecord, EveningAnswers, EveningRecord, MorningAnswers, MorningRecord, Schema,
    Settings,
};
use crate::store::KeyValueStore;

/// Longest accepted answer, in characters.
pub const MAX_ANSWER_CHARS: usize = 2000;

/// Completion filter for the journal log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFilter {
    #[default]
    All,
    /// Both morning and evening written.
    Complete,
    /// At least one of the two missing.
    Incomplete,
}

impl LogFilter {
    #[must_use]
    pub fn matches(self, record: &DayRecord) -> bool {
        match self {
            Self::All => true,
            Self::Complete => record.is_complete(),
            Self::Incomplete => !record.is_complete(),
        }
    }
}

impl FromStr for LogFilter {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "complete" => Ok(Self::Complete),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(StorageError::InvalidInput(format!(
                "Invalid filter '{s}'. Use all, complete, or incomplete"
            ))),
        }
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        })
    }
}

/// Records matching a log query, newest first, plus counts over all records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub records: Vec<DayRecord>,
    pub total: usize,
    pub complete: usize,
    pub incomplete: usize,
}

/// Countdown summary for one day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub today: String,
    pub today_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_display: Option<String>,
    /// Raw `target - today`; negative once the target has passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_started: Option<String>,
    pub morning_done: bool,
    pub evening_done: bool,
}

impl Status {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.target_date.is_some()
    }

    /// Remaining days as shown to the user: never below zero.
    #[must_use]
    pub fn displayed_remaining(&self) -> Option<i64> {
        self.remaining_days.map(|d| d.max(0))
    }
}

/// Convenience layer over a [`StorageAdapter`]: absent values come back as
/// defaults, and day entries are built with their timestamps here.
pub struct Journal {
    adapter: Box<dyn StorageAdapter>,
}

impl Journal {
    pub fn new(adapter: Box<dyn StorageAdapter>) -> Self {
        Self { adapter }
    }

    pub fn open<S: KeyValueStore + 'static>(backend: Backend, store: S) -> Result<Self> {
        Ok(Self::new(open_adapter(backend, store)?))
    }

    // --- Settings ---

    /// Saved settings, or an empty target date when none are saved.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.adapter.get_settings()?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.adapter.set_settings(settings)
    }

    /// Sets the target date from user input. The date must be a real
    /// `YYYY-MM-DD` date no earlier than `today`.
    pub fn set_target_date(
        &self,
        target: &str,
        passcode: Option<String>,
        today: NaiveDate,
    ) -> Result<Settings> {
        let target = target.trim();
        if target.is_empty() {
            return Err(StorageError::InvalidInput(
                "A target date is required".to_string(),
            ));
        }
        let date = parse_date(target).ok_or_else(|| {
            StorageError::InvalidInput(format!("Invalid date '{target}'. Use YYYY-MM-DD"))
        })?;
        if date < today {
            return Err(StorageError::InvalidInput(format!(
                "The target date must be today ({}) or later",
                today.format(DATE_FORMAT)
            )));
        }
        let settings = Settings {
            target_date: target.to_string(),
            passcode: passcode.filter(|p| !p.is_empty()),
        };
        self.adapter.set_settings(&settings)?;
        Ok(settings)
    }

    // --- Day records ---

    /// The record for `date`, or an empty one when nothing is written yet.
    pub fn day(&self, date: &str) -> Result<DayRecord> {
        Ok(self
            .adapter
            .get_day_record(date)?
            .unwrap_or_else(|| DayRecord::empty(date)))
    }

    pub fn save_day(&self, record: &DayRecord) -> Result<()> {
        self.adapter.set_day_record(record)
    }

    pub fn all_days(&self) -> Result<Vec<DayRecord>> {
        self.adapter.get_all_day_records()
    }

    /// Writes the morning entry for `date`, keeping its original `createdAt`.
    pub fn save_morning(&self, date: &str, answers: MorningAnswers, now: &str) -> Result<DayRecord> {
        check_date(date)?;
        check_length("usage", &answers.usage)?;
        check_length("regret", &answers.regret)?;
        check_length("freeText", answers.free_text.as_deref().unwrap_or_default())?;

        let mut record = self.day(date)?;
        let created_at = record
            .morning
            .as_ref()
            .map_or_else(|| now.to_string(), |m| m.created_at.clone());
        record.morning = Some(MorningRecord {
            date: date.to_string(),
            answers: MorningAnswers {
                free_text: answers.free_text.filter(|t| !t.is_empty()),
                ..answers
            },
            created_at,
            updated_at: now.to_string(),
        });
        self.adapter.set_day_record(&record)?;
        Ok(record)
    }

    /// Writes the evening entry for `date`, keeping its original `createdAt`.
    pub fn save_evening(&self, date: &str, answers: EveningAnswers, now: &str) -> Result<DayRecord> {
        check_date(date)?;
        check_length("mostVital", &answers.most_vital)?;
        check_length("waste", &answers.waste)?;
        check_length("tomorrow", &answers.tomorrow)?;
        check_length("freeText", answers.free_text.as_deref().unwrap_or_default())?;

        let mut record = self.day(date)?;
        let created_at = record
            .evening
            .as_ref()
            .map_or_else(|| now.to_string(), |e| e.created_at.clone());
        record.evening = Some(EveningRecord {
            date: date.to_string(),
            answers: EveningAnswers {
                free_text: answers.free_text.filter(|t| !t.is_empty()),
                ..answers
            },
            created_at,
            updated_at: now.to_string(),
        });
        self.adapter.set_day_record(&record)?;
        Ok(record)
    }

    // --- Views ---

    pub fn status(&self, today: NaiveDate) -> Result<Status> {
        let settings = self.settings()?;
        let records = self.all_days()?;
        let today_str = today.format(DATE_FORMAT).to_string();

        let target = settings.is_configured().then_some(settings.target_date);
        let target_parsed = target.as_deref().and_then(parse_date);
        let remaining_days = target_parsed.map(|t| remaining_days_on(today, t));
        let journal_started = records.first().map(|r| r.date.clone());
        let start = journal_started
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(today);
        let todays = records.iter().find(|r| r.date == today_str);

        Ok(Status {
            today_display: format_for_display(today),
            target_display: target.as_deref().map(format_str_for_display),
            expired: remaining_days.is_some_and(|d| d <= 0),
            progress: target_parsed.map(|t| progress_on(today, start, t)),
            morning_done: todays.is_some_and(|r| r.morning.is_some()),
            evening_done: todays.is_some_and(|r| r.evening.is_some()),
            today: today_str,
            target_date: target,
            remaining_days,
            journal_started,
        })
    }

    /// Records newest first, filtered by completion and a case-insensitive
    /// search over every answer.
    pub fn log(&self, filter: LogFilter, search: Option<&str>) -> Result<LogView> {
        let records = self.all_days()?;
        let total = records.len();
        let complete = records.iter().filter(|r| r.is_complete()).count();
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<DayRecord> = records
            .into_iter()
            .filter(|r| filter.matches(r))
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.texts().any(|t| t.to_lowercase().contains(n)))
            })
            .collect();
        matched.reverse();

        Ok(LogView {
            records: matched,
            total,
            complete,
            incomplete: total - complete,
        })
    }

    // --- Backup ---

    pub fn export(&self) -> Result<AppData> {
        self.adapter.export_data()
    }

    /// Export as pretty JSON, the backup file format.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export()?)?)
    }

    pub fn import(&self, data: &AppData) -> Result<()> {
        self.adapter.import_data(data)
    }

    /// Parses and validates a backup file, then imports it. Nothing is
    /// written unless the whole file is valid.
    pub fn import_json(&self, text: &str) -> Result<AppData> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let data = AppData::parse(&value)?;
        self.adapter.import_data(&data)?;
        Ok(data)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.adapter.clear_data()
    }
}

fn check_date(date: &str) -> Result<()> {
    if is_valid_date_string(date) {
        Ok(())
    } else {
        Err(StorageError::InvalidInput(format!(
            "Invalid date '{date}'. Use YYYY-MM-DD"
        )))
    }
}

fn check_length(field: &str, value: &str) -> Result<()> {
    if value.chars().count() > MAX_ANSWER_CHARS {
        return Err(StorageError::InvalidInput(format!(
            "{field} must be at most {MAX_ANSWER_CHARS} characters"
        )));
    }
    Ok(())
}
