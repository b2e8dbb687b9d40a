//! Pure list filters over store collections.
//!
//! # Invariants
//! - No hidden state: output depends only on the inputs and `now`.
//! - Sorting is stable, so equal keys keep insertion order.
//! - Overdue and upcoming are evaluated against the `now` argument.

use crate::error::ValidationError;
use crate::model::{Assignment, AssignmentStatus, Lecture, SemesterId};
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;

/// Default row count for `upcoming_deadlines`.
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

/// Assignment list status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
    /// Pending and due strictly before now.
    Overdue,
}

impl StatusFilter {
    pub fn matches(self, assignment: &Assignment, now: NaiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Pending => assignment.status == AssignmentStatus::Pending,
            Self::Completed => assignment.status == AssignmentStatus::Completed,
            Self::Overdue => assignment.is_overdue(now),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            _ => Err(ValidationError::Malformed {
                field: "status",
                value: value.to_string(),
            }),
        }
    }
}

/// Semester scope shared by every semester-aware view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SemesterFilter {
    #[default]
    All,
    Only(SemesterId),
}

impl SemesterFilter {
    pub fn matches(self, semester_id: SemesterId) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => id == semester_id,
        }
    }
}

impl FromStr for SemesterFilter {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .parse::<SemesterId>()
            .map(Self::Only)
            .map_err(|_| ValidationError::Malformed {
                field: "semesterId",
                value: value.to_string(),
            })
    }
}

/// Assignments matching both filters, ascending by due moment.
pub fn filter_assignments(
    assignments: &[Assignment],
    status: StatusFilter,
    semester: SemesterFilter,
    now: NaiveDateTime,
) -> Vec<&Assignment> {
    let mut matched: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| status.matches(a, now) && semester.matches(a.semester_id))
        .collect();
    matched.sort_by_key(|a| a.due_at());
    matched
}

/// Lectures in scope, ascending by start moment.
pub fn filter_lectures(lectures: &[Lecture], semester: SemesterFilter) -> Vec<&Lecture> {
    let mut matched: Vec<&Lecture> = lectures
        .iter()
        .filter(|l| semester.matches(l.semester_id))
        .collect();
    matched.sort_by_key(|l| l.starts_at());
    matched
}

/// Pending assignments due strictly after `now`, soonest first.
pub fn upcoming_deadlines(
    assignments: &[Assignment],
    now: NaiveDateTime,
    limit: usize,
) -> Vec<&Assignment> {
    let mut upcoming: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Pending && a.due_at() > now)
        .collect();
    upcoming.sort_by_key(|a| a.due_at());
    upcoming.truncate(limit);
    upcoming
}

/// Lectures held on `today`, ascending by time.
pub fn today_schedule(lectures: &[Lecture], today: NaiveDate) -> Vec<&Lecture> {
    let mut todays: Vec<&Lecture> = lectures.iter().filter(|l| l.date == today).collect();
    todays.sort_by_key(|l| l.time);
    todays
}
