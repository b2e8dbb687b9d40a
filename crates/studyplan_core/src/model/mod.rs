//! Academic planning domain model.
//!
//! # Responsibility
//! - Define canonical records held by the entity store.
//! - Parse raw form input into typed values before any mutation runs.
//!
//! # Invariants
//! - Every identified record carries an id issued by `IdSequence` and never
//!   reused, even after deletion.
//! - Subjects have no id; they are referenced by exact name.
//! - Overdue is derived at read time, never stored.

pub mod academic;
pub mod input;
pub mod personal;

pub use academic::{
    Assignment, AssignmentId, AssignmentStatus, Grade, GradeParseError, Lecture, LectureId,
    Priority, Semester, SemesterId,
};
pub use input::{NewAssignment, NewLecture, NewSemester, ProfileUpdate};
pub use personal::{ActivityId, ActivityLogEntry, Profile, Todo, TodoId, DEFAULT_PICTURE_REF};
