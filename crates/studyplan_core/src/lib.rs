//! Core domain logic for the study planner.
//! This crate is the single source of truth for planner invariants.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod notify;
pub mod persist;
pub mod service;
pub mod store;
pub mod timer;
pub mod views;

pub use aggregate::{
    average_grade, dashboard_counters, gpa, grade_report, letter_grade, per_subject_average,
    DashboardCounters, GradeReport, LetterGrade, SubjectGrades,
};
pub use config::{ConfigError, PlannerConfig};
pub use error::{
    EntityKind, PersistenceError, PlannerError, PlannerResult, RangeError, ReferentialError,
    ValidationError,
};
pub use integrity::DeletePolicy;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    Assignment, AssignmentId, AssignmentStatus, Grade, Lecture, LectureId, NewAssignment,
    NewLecture, NewSemester, Priority, Profile, ProfileUpdate, Semester, SemesterId, Todo, TodoId,
};
pub use notify::{ChangeEvent, ChangeSet, Collection, ViewKind};
pub use persist::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use service::clock::{Clock, FixedClock, SystemClock};
pub use service::planner::{EventTarget, Planner, PlannerOptions};
pub use store::PlannerStore;
pub use timer::{FocusTimer, SessionKind, TickOutcome, TimerSettings};
pub use views::calendar::{CalendarEvent, EventCategory, EventRef};
pub use views::filters::{SemesterFilter, StatusFilter};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
