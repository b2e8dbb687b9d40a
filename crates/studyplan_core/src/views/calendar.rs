//! Calendar event projection for the calendar widget.
//!
//! # Responsibility
//! - Project lectures, pending assignments and holidays into one event list.
//! - Give entity-backed events a composite id (`category:entityId`) that
//!   maps interactions back to the owning record.
//!
//! # Invariants
//! - Event ids are stable across recomputation for the same entity.
//! - Output is sorted by start moment; ties keep lecture, assignment,
//!   holiday order.

use crate::error::ValidationError;
use crate::model::{Assignment, AssignmentId, AssignmentStatus, Lecture, LectureId};
use crate::views::filters::{filter_lectures, SemesterFilter};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Fixed-date observances shown on every calendar year.
const FIXED_HOLIDAYS: &[(u32, u32, &str)] = &[
    (1, 1, "New Year's Day"),
    (5, 1, "Labour Day"),
    (12, 24, "Christmas Eve"),
    (12, 25, "Christmas Day"),
    (12, 31, "New Year's Eve"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventCategory {
    Lecture,
    Assignment,
    Holiday,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lecture => "lecture",
            Self::Assignment => "assignment",
            Self::Holiday => "holiday",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// `lecture:<id>`, `assignment:<id>` or `holiday:<yyyy-mm-dd>`.
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub all_day: bool,
    pub category: EventCategory,
}

/// Entity reference decoded from a calendar event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    Lecture(LectureId),
    Assignment(AssignmentId),
    Holiday(NaiveDate),
}

impl Display for EventRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lecture(id) => write!(f, "lecture:{id}"),
            Self::Assignment(id) => write!(f, "assignment:{id}"),
            Self::Holiday(date) => write!(f, "holiday:{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for EventRef {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::Malformed {
            field: "eventId",
            value: value.to_string(),
        };
        let (category, key) = value.trim().split_once(':').ok_or_else(malformed)?;
        match category {
            "lecture" => key.parse().map(Self::Lecture).map_err(|_| malformed()),
            "assignment" => key.parse().map(Self::Assignment).map_err(|_| malformed()),
            "holiday" => NaiveDate::parse_from_str(key, "%Y-%m-%d")
                .map(Self::Holiday)
                .map_err(|_| malformed()),
            _ => Err(malformed()),
        }
    }
}

/// Named all-day date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Static holiday list expanded per calendar year.
pub fn fixed_holidays(years: RangeInclusive<i32>) -> Vec<Holiday> {
    years
        .flat_map(|year| {
            FIXED_HOLIDAYS.iter().filter_map(move |(month, day, name)| {
                NaiveDate::from_ymd_opt(year, *month, *day).map(|date| Holiday {
                    date,
                    name: (*name).to_string(),
                })
            })
        })
        .collect()
}

pub fn lecture_event(lecture: &Lecture) -> CalendarEvent {
    CalendarEvent {
        id: EventRef::Lecture(lecture.id).to_string(),
        title: format!("Lecture: {} ({})", lecture.title, lecture.subject),
        start: lecture.starts_at(),
        end: lecture.ends_at(),
        all_day: false,
        category: EventCategory::Lecture,
    }
}

pub fn assignment_event(assignment: &Assignment) -> CalendarEvent {
    CalendarEvent {
        id: EventRef::Assignment(assignment.id).to_string(),
        title: format!("Assignment: {} ({})", assignment.title, assignment.subject),
        start: assignment.due_at(),
        end: None,
        all_day: false,
        category: EventCategory::Assignment,
    }
}

pub fn holiday_event(holiday: &Holiday) -> CalendarEvent {
    CalendarEvent {
        id: EventRef::Holiday(holiday.date).to_string(),
        title: holiday.name.clone(),
        start: NaiveDateTime::new(holiday.date, NaiveTime::MIN),
        end: None,
        all_day: true,
        category: EventCategory::Holiday,
    }
}

/// Builds the widget event list for one semester scope.
pub fn calendar_events(
    lectures: &[Lecture],
    assignments: &[Assignment],
    holidays: &[Holiday],
    semester: SemesterFilter,
) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = filter_lectures(lectures, semester)
        .into_iter()
        .map(lecture_event)
        .collect();
    events.extend(
        assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Pending && semester.matches(a.semester_id))
            .map(assignment_event),
    );
    events.extend(holidays.iter().map(holiday_event));
    events.sort_by_key(|event| event.start);
    events
}

#[cfg(test)]
mod tests {
    use super::{fixed_holidays, EventRef};
    use chrono::NaiveDate;

    #[test]
    fn event_ref_round_trips_through_display() {
        for reference in [
            EventRef::Lecture(12),
            EventRef::Assignment(3),
            EventRef::Holiday(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()),
        ] {
            assert_eq!(reference.to_string().parse::<EventRef>().unwrap(), reference);
        }
    }

    #[test]
    fn event_ref_rejects_unknown_category_and_bad_ids() {
        assert!("exam:1".parse::<EventRef>().is_err());
        assert!("lecture:abc".parse::<EventRef>().is_err());
        assert!("assignment-4".parse::<EventRef>().is_err());
    }

    #[test]
    fn fixed_holidays_repeat_per_year() {
        let holidays = fixed_holidays(2025..=2026);
        assert_eq!(holidays.len(), 10);
        assert!(holidays
            .iter()
            .any(|h| h.date == NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }
}
