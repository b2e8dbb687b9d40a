//! Semester, lecture and assignment records.
//!
//! # Invariants
//! - `Semester::start_date <= Semester::end_date`.
//! - `Grade::Numeric` values lie within `0..=100`.
//! - Only `Grade::Numeric` participates in averages.

use crate::error::{PlannerError, RangeError, ValidationError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type SemesterId = u64;
pub type LectureId = u64;
pub type AssignmentId = u64;

const DEFAULT_LECTURE_MINUTES: u32 = 60;

static NUMERIC_GRADE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*%?$").expect("valid numeric grade regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: SemesterId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: LectureId,
    pub title: String,
    pub subject: String,
    pub semester_id: SemesterId,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_lecture_minutes")]
    pub duration_minutes: u32,
}

impl Lecture {
    pub fn starts_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// `None` when the end would fall past the last representable date.
    pub fn ends_at(&self) -> Option<NaiveDateTime> {
        lecture_end(self.starts_at(), self.duration_minutes)
    }
}

pub(crate) fn lecture_end(starts_at: NaiveDateTime, minutes: u32) -> Option<NaiveDateTime> {
    starts_at.checked_add_signed(chrono::Duration::minutes(i64::from(minutes)))
}

fn default_lecture_minutes() -> u32 {
    DEFAULT_LECTURE_MINUTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "" => Err(ValidationError::MissingField("priority")),
            _ => Err(ValidationError::Malformed {
                field: "priority",
                value: value.to_string(),
            }),
        }
    }
}

/// User-driven assignment lifecycle. Overdue is not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(ValidationError::Malformed {
                field: "status",
                value: value.to_string(),
            }),
        }
    }
}

/// Recorded grade: a percentage or free text such as `A+`.
///
/// Persisted untagged. On read, numeric-looking strings written by older
/// builds (`"95"`, `"88%"`) are promoted to `Numeric`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawGrade")]
pub enum Grade {
    Numeric(f64),
    Letter(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGrade {
    Number(f64),
    Text(String),
}

impl From<RawGrade> for Grade {
    fn from(value: RawGrade) -> Self {
        match value {
            RawGrade::Number(value) => Self::Numeric(value),
            RawGrade::Text(text) => Self::parse(&text).unwrap_or(Self::Letter(text)),
        }
    }
}

impl Grade {
    /// Parses free-form grade text.
    ///
    /// `"95"`, `"95%"` and `" 87.5 "` become numeric grades; any other
    /// non-blank text is kept verbatim (trimmed) as a letter grade.
    ///
    /// # Errors
    /// - `MissingField` when the text is blank.
    /// - `GradeOutOfRange` when a numeric value falls outside `0..=100`.
    pub fn parse(text: &str) -> Result<Self, GradeParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GradeParseError::Validation(ValidationError::MissingField(
                "grade",
            )));
        }
        if let Some(caps) = NUMERIC_GRADE_RE.captures(trimmed) {
            if let Ok(value) = caps[1].parse::<f64>() {
                return Self::numeric(value).map_err(GradeParseError::Range);
            }
        }
        Ok(Self::Letter(trimmed.to_string()))
    }

    /// Builds a numeric grade after range validation.
    pub fn numeric(value: f64) -> Result<Self, RangeError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(RangeError::GradeOutOfRange(value));
        }
        Ok(Self::Numeric(value))
    }

    /// Checks the invariant for values built without `parse`/`numeric`.
    pub fn validate(&self) -> Result<(), GradeParseError> {
        match self {
            Self::Numeric(value) => Self::numeric(*value)
                .map(|_| ())
                .map_err(GradeParseError::Range),
            Self::Letter(text) if text.trim().is_empty() => Err(GradeParseError::Validation(
                ValidationError::MissingField("grade"),
            )),
            Self::Letter(_) => Ok(()),
        }
    }

    /// Percentage value; `None` for letter grades.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Letter(_) => None,
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Letter(text) => f.write_str(text),
        }
    }
}

/// Grade parse failure split by error family.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeParseError {
    Validation(ValidationError),
    Range(RangeError),
}

impl From<GradeParseError> for PlannerError {
    fn from(value: GradeParseError) -> Self {
        match value {
            GradeParseError::Validation(err) => Self::Validation(err),
            GradeParseError::Range(err) => Self::Range(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub title: String,
    pub subject: String,
    pub semester_id: SemesterId,
    pub due_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub due_time: NaiveTime,
    pub priority: Priority,
    pub status: AssignmentStatus,
    #[serde(default, deserialize_with = "recorded_grade")]
    pub grade: Option<Grade>,
}

/// Blank grade text left by older builds means "not graded".
fn recorded_grade<'de, D>(deserializer: D) -> Result<Option<Grade>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<RawGrade>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawGrade::Text(text) if text.trim().is_empty() => None,
        raw => Some(Grade::from(raw)),
    }))
}

impl Assignment {
    /// Combined due moment in local wall-clock time.
    pub fn due_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.due_date, self.due_time)
    }

    pub fn is_completed(&self) -> bool {
        self.status == AssignmentStatus::Completed
    }

    /// Pending and due strictly before `now`.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status == AssignmentStatus::Pending && self.due_at() < now
    }

    pub fn numeric_grade(&self) -> Option<f64> {
        self.grade.as_ref().and_then(Grade::percentage)
    }
}

/// `HH:MM` wall-clock serialization; seconds are accepted on read.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_clock_time(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid wall-clock time `{text}`"))
        })
    }
}

pub(crate) fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let trimmed = text.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}
