//! Raw form input and its validation into typed drafts.
//!
//! Parsing never touches the store; drafts only receive an id once every
//! field and reference check has passed.

use crate::error::{PlannerResult, RangeError, ValidationError};
use crate::model::academic::{
    lecture_end, parse_clock_time, Assignment, AssignmentId, AssignmentStatus, Lecture,
    LectureId, Priority, Semester, SemesterId,
};
use crate::model::personal::Profile;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Semester form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSemester {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`.
    pub end_date: String,
}

/// Lecture form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLecture {
    pub title: String,
    pub subject: String,
    pub semester_id: Option<SemesterId>,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    pub location: String,
    /// Defaults to 60 when absent.
    pub duration_minutes: Option<u32>,
}

/// Assignment form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAssignment {
    pub title: String,
    pub subject: String,
    pub semester_id: Option<SemesterId>,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    /// `HH:MM`.
    pub due_time: String,
    /// `low|medium|high`.
    pub priority: String,
}

/// Full replacement of the editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub student_id: String,
    pub major: String,
    pub year: String,
}

pub(crate) struct SemesterDraft {
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl SemesterDraft {
    pub(crate) fn into_semester(self, id: SemesterId) -> Semester {
        Semester {
            id,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

pub(crate) struct LectureDraft {
    pub(crate) subject: String,
    pub(crate) semester_id: SemesterId,
    title: String,
    date: NaiveDate,
    time: NaiveTime,
    location: String,
    duration_minutes: u32,
}

impl LectureDraft {
    pub(crate) fn into_lecture(self, id: LectureId) -> Lecture {
        Lecture {
            id,
            title: self.title,
            subject: self.subject,
            semester_id: self.semester_id,
            date: self.date,
            time: self.time,
            location: self.location,
            duration_minutes: self.duration_minutes,
        }
    }
}

pub(crate) struct AssignmentDraft {
    pub(crate) subject: String,
    pub(crate) semester_id: SemesterId,
    title: String,
    due_date: NaiveDate,
    due_time: NaiveTime,
    priority: Priority,
}

impl AssignmentDraft {
    pub(crate) fn into_assignment(self, id: AssignmentId) -> Assignment {
        Assignment {
            id,
            title: self.title,
            subject: self.subject,
            semester_id: self.semester_id,
            due_date: self.due_date,
            due_time: self.due_time,
            priority: self.priority,
            status: AssignmentStatus::Pending,
            grade: None,
        }
    }
}

impl NewSemester {
    pub(crate) fn parse(&self) -> PlannerResult<SemesterDraft> {
        let name = required("name", &self.name)?;
        let start_raw = required("startDate", &self.start_date)?;
        let end_raw = required("endDate", &self.end_date)?;
        let start_date = parse_date("startDate", &start_raw)?;
        let end_date = parse_date("endDate", &end_raw)?;
        if start_date > end_date {
            return Err(RangeError::InvalidDateRange {
                start: start_date,
                end: end_date,
            }
            .into());
        }
        Ok(SemesterDraft {
            name,
            start_date,
            end_date,
        })
    }
}

impl NewLecture {
    pub(crate) fn parse(&self) -> PlannerResult<LectureDraft> {
        let title = required("title", &self.title)?;
        let subject = required("subject", &self.subject)?;
        let semester_id = self
            .semester_id
            .ok_or(ValidationError::MissingField("semesterId"))?;
        let date_raw = required("date", &self.date)?;
        let time_raw = required("time", &self.time)?;
        let date = parse_date("date", &date_raw)?;
        let time = parse_time("time", &time_raw)?;
        let duration_minutes = match self.duration_minutes {
            Some(0) => {
                return Err(ValidationError::Malformed {
                    field: "durationMinutes",
                    value: "0".to_string(),
                }
                .into())
            }
            Some(minutes) => minutes,
            None => 60,
        };
        if lecture_end(NaiveDateTime::new(date, time), duration_minutes).is_none() {
            return Err(ValidationError::Malformed {
                field: "durationMinutes",
                value: duration_minutes.to_string(),
            }
            .into());
        }
        Ok(LectureDraft {
            subject,
            semester_id,
            title,
            date,
            time,
            location: self.location.trim().to_string(),
            duration_minutes,
        })
    }
}

impl NewAssignment {
    pub(crate) fn parse(&self) -> PlannerResult<AssignmentDraft> {
        let title = required("title", &self.title)?;
        let subject = required("subject", &self.subject)?;
        let semester_id = self
            .semester_id
            .ok_or(ValidationError::MissingField("semesterId"))?;
        let date_raw = required("dueDate", &self.due_date)?;
        let time_raw = required("dueTime", &self.due_time)?;
        let priority = self.priority.parse::<Priority>()?;
        let due_date = parse_date("dueDate", &date_raw)?;
        let due_time = parse_time("dueTime", &time_raw)?;
        Ok(AssignmentDraft {
            subject,
            semester_id,
            title,
            due_date,
            due_time,
            priority,
        })
    }
}

impl ProfileUpdate {
    /// Applies the update on top of `current`, keeping the picture reference.
    pub(crate) fn apply(&self, current: &Profile) -> Result<Profile, ValidationError> {
        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            return Err(ValidationError::Malformed {
                field: "email",
                value: email.to_string(),
            });
        }
        Ok(Profile {
            full_name: self.full_name.trim().to_string(),
            email: email.to_string(),
            phone: self.phone.trim().to_string(),
            student_id: self.student_id.trim().to_string(),
            major: self.major.trim().to_string(),
            year: self.year.trim().to_string(),
            picture_ref: current.picture_ref.clone(),
        })
    }
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::Malformed {
        field,
        value: value.to_string(),
    })
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ValidationError> {
    parse_clock_time(value).ok_or_else(|| ValidationError::Malformed {
        field,
        value: value.to_string(),
    })
}
