//! Journal record shapes and their validation.
//!
//! Every shape can be built from an untrusted [`serde_json::Value`] with
//! [`Schema::parse`], which walks the whole value and reports every malformed
//! field by path, or checked in place with [`Schema::validate`] when it was
//! built in code. Both paths apply the same content rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::date::is_valid_date_string;
use crate::error::{Issue, ValidationError};

/// Version string written into every export.
pub const DATA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub target_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
}

impl Settings {
    /// Whether the user has chosen a target date yet.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.target_date.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorningAnswers {
    /// What will this day be used for?
    pub usage: String,
    /// Will it be regretted?
    pub regret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorningRecord {
    pub date: String,
    pub answers: MorningAnswers,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EveningAnswers {
    /// What used life most fully today.
    pub most_vital: String,
    /// What was wasted.
    pub waste: String,
    /// What to change tomorrow.
    pub tomorrow: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EveningRecord {
    pub date: String,
    pub answers: EveningAnswers,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morning: Option<MorningRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evening: Option<EveningRecord>,
}

impl DayRecord {
    #[must_use]
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            morning: None,
            evening: None,
        }
    }

    /// Both entries written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.morning.is_some() && self.evening.is_some()
    }

    /// Every answer text of the day, morning first.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        let morning = self.morning.iter().flat_map(|m| {
            [
                Some(m.answers.usage.as_str()),
                Some(m.answers.regret.as_str()),
                m.answers.free_text.as_deref(),
            ]
        });
        let evening = self.evening.iter().flat_map(|e| {
            [
                Some(e.answers.most_vital.as_str()),
                Some(e.answers.waste.as_str()),
                Some(e.answers.tomorrow.as_str()),
                e.answers.free_text.as_deref(),
            ]
        });
        morning.chain(evening).flatten()
    }

    /// `updatedAt` of the latest entry, evening preferred.
    #[must_use]
    pub fn last_updated(&self) -> Option<&str> {
        self.evening
            .as_ref()
            .map(|e| e.updated_at.as_str())
            .or_else(|| self.morning.as_ref().map(|m| m.updated_at.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppData {
    pub settings: Settings,
    pub records: Vec<DayRecord>,
    pub version: String,
}

impl AppData {
    fn check_records(&self, c: &mut Checker) {
        for (i, record) in self.records.iter().enumerate() {
            record.check(c, &format!("records[{i}]"));
        }
    }
}

/// Sorts records ascending by date. When a date repeats, the later entry wins.
#[must_use]
pub fn normalize_records(records: Vec<DayRecord>) -> Vec<DayRecord> {
    let by_date: BTreeMap<String, DayRecord> =
        records.into_iter().map(|r| (r.date.clone(), r)).collect();
    by_date.into_values().collect()
}

pub trait Schema: Sized {
    /// Build a typed value from untrusted input, collecting every issue.
    fn parse(value: &Value) -> Result<Self, ValidationError> {
        let mut c = Checker::default();
        let out = Self::read(&mut c, value, "");
        c.finish(out)
    }

    /// Re-check a value that was built in code.
    fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::default();
        self.check(&mut c, "");
        c.finish(Some(()))
    }

    #[doc(hidden)]
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self>;

    #[doc(hidden)]
    fn check(&self, c: &mut Checker, path: &str);
}

impl Settings {
    fn read_fields(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let obj = c.object(value, path)?;
        let target_date = c.string(obj, path, "targetDate");
        let passcode = c.optional_string(obj, path, "passcode");
        Some(Self {
            target_date: target_date?,
            passcode: passcode?,
        })
    }
}

impl Schema for Settings {
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let settings = Self::read_fields(c, value, path)?;
        settings.check(c, path);
        Some(settings)
    }

    fn check(&self, c: &mut Checker, path: &str) {
        if self.target_date.is_empty() {
            c.push(join(path, "targetDate"), "a target date is required");
        }
    }
}

impl Schema for MorningRecord {
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let obj = c.object(value, path)?;
        let date = c.string(obj, path, "date");
        let answers = c.field(obj, path, "answers").and_then(|v| {
            let path = join(path, "answers");
            let obj = c.object(v, &path)?;
            let usage = c.string(obj, &path, "usage");
            let regret = c.string(obj, &path, "regret");
            let free_text = c.optional_string(obj, &path, "freeText");
            Some(MorningAnswers {
                usage: usage?,
                regret: regret?,
                free_text: free_text?,
            })
        });
        let created_at = c.string(obj, path, "createdAt");
        let updated_at = c.string(obj, path, "updatedAt");
        let record = Self {
            date: date?,
            answers: answers?,
            created_at: created_at?,
            updated_at: updated_at?,
        };
        record.check(c, path);
        Some(record)
    }

    fn check(&self, c: &mut Checker, path: &str) {
        let path = join(path, "answers");
        check_non_empty(c, &join(&path, "usage"), &self.answers.usage);
        check_non_empty(c, &join(&path, "regret"), &self.answers.regret);
    }
}

impl Schema for EveningRecord {
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let obj = c.object(value, path)?;
        let date = c.string(obj, path, "date");
        let answers = c.field(obj, path, "answers").and_then(|v| {
            let path = join(path, "answers");
            let obj = c.object(v, &path)?;
            let most_vital = c.string(obj, &path, "mostVital");
            let waste = c.string(obj, &path, "waste");
            let tomorrow = c.string(obj, &path, "tomorrow");
            let free_text = c.optional_string(obj, &path, "freeText");
            Some(EveningAnswers {
                most_vital: most_vital?,
                waste: waste?,
                tomorrow: tomorrow?,
                free_text: free_text?,
            })
        });
        let created_at = c.string(obj, path, "createdAt");
        let updated_at = c.string(obj, path, "updatedAt");
        let record = Self {
            date: date?,
            answers: answers?,
            created_at: created_at?,
            updated_at: updated_at?,
        };
        record.check(c, path);
        Some(record)
    }

    fn check(&self, c: &mut Checker, path: &str) {
        let path = join(path, "answers");
        check_non_empty(c, &join(&path, "mostVital"), &self.answers.most_vital);
        check_non_empty(c, &join(&path, "waste"), &self.answers.waste);
        check_non_empty(c, &join(&path, "tomorrow"), &self.answers.tomorrow);
    }
}

impl Schema for DayRecord {
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let obj = c.object(value, path)?;
        let date = c.string(obj, path, "date");
        let morning = c.optional(obj, "morning").map_or(Some(None), |v| {
            MorningRecord::read(c, v, &join(path, "morning")).map(Some)
        });
        let evening = c.optional(obj, "evening").map_or(Some(None), |v| {
            EveningRecord::read(c, v, &join(path, "evening")).map(Some)
        });
        let record = Self {
            date: date?,
            morning: morning?,
            evening: evening?,
        };
        if !is_valid_date_string(&record.date) {
            c.push(join(path, "date"), "expected a YYYY-MM-DD date");
        }
        Some(record)
    }

    fn check(&self, c: &mut Checker, path: &str) {
        if !is_valid_date_string(&self.date) {
            c.push(join(path, "date"), "expected a YYYY-MM-DD date");
        }
        if let Some(m) = &self.morning {
            m.check(c, &join(path, "morning"));
        }
        if let Some(e) = &self.evening {
            e.check(c, &join(path, "evening"));
        }
    }
}

impl Schema for AppData {
    fn read(c: &mut Checker, value: &Value, path: &str) -> Option<Self> {
        let obj = c.object(value, path)?;
        let settings = c
            .field(obj, path, "settings")
            .and_then(|v| Settings::read_fields(c, v, &join(path, "settings")));
        let records = c.field(obj, path, "records").and_then(|v| {
            let path = join(path, "records");
            let Some(items) = v.as_array() else {
                c.push(path, format!("expected array, got {}", kind(v)));
                return None;
            };
            let parsed: Vec<Option<DayRecord>> = items
                .iter()
                .enumerate()
                .map(|(i, item)| DayRecord::read(c, item, &format!("{path}[{i}]")))
                .collect();
            parsed.into_iter().collect::<Option<Vec<_>>>()
        });
        let version = c.string(obj, path, "version");
        if let Some(v) = &version {
            check_non_empty(c, &join(path, "version"), v);
        }
        Some(Self {
            settings: settings?,
            records: records?,
            version: version?,
        })
    }

    // Settings without a target date are the "unset" placeholder and pass.
    fn check(&self, c: &mut Checker, path: &str) {
        self.check_records(c);
        check_non_empty(c, &join(path, "version"), &self.version);
    }
}

/// Issue collector used while walking a value.
#[derive(Debug, Default)]
pub struct Checker {
    issues: Vec<Issue>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn finish<T>(self, out: Option<T>) -> Result<T, ValidationError> {
        match out {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ValidationError {
                issues: self.issues,
            }),
        }
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.push(path, format!("expected object, got {}", kind(value)));
        }
        obj
    }

    fn field<'v>(&mut self, obj: &'v Map<String, Value>, path: &str, key: &str) -> Option<&'v Value> {
        let value = self.optional(obj, key);
        if value.is_none() {
            self.push(join(path, key), "required");
        }
        value
    }

    /// Absent and `null` both count as missing.
    #[allow(clippy::unused_self)]
    fn optional<'v>(&self, obj: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
        obj.get(key).filter(|v| !v.is_null())
    }

    fn string(&mut self, obj: &Map<String, Value>, path: &str, key: &str) -> Option<String> {
        let value = self.field(obj, path, key)?;
        let s = value.as_str().map(str::to_string);
        if s.is_none() {
            self.push(join(path, key), format!("expected string, got {}", kind(value)));
        }
        s
    }

    /// `Some(None)` when absent, `None` when present but not a string.
    #[allow(clippy::option_option)]
    fn optional_string(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<Option<String>> {
        let Some(value) = self.optional(obj, key) else {
            return Some(None);
        };
        if let Some(s) = value.as_str() {
            Some(Some(s.to_string()))
        } else {
            self.push(join(path, key), format!("expected string, got {}", kind(value)));
            None
        }
    }
}

fn check_non_empty(c: &mut Checker, path: &str, value: &str) {
    if value.is_empty() {
        c.push(path, "must not be empty");
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
