//! Error taxonomy for planner mutations.
//!
//! # Responsibility
//! - Classify every rejected user action into one recoverable family.
//! - Keep persistence failures distinct from input failures.
//!
//! # Invariants
//! - A returned `ValidationError`, `ReferentialError` or `RangeError` means
//!   the store was left untouched.
//! - A `PersistenceError` never implies in-memory rollback.

use crate::db::DbError;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Entity family used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Subject,
    Semester,
    Lecture,
    Assignment,
    Todo,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Semester => "semester",
            Self::Lecture => "lecture",
            Self::Assignment => "assignment",
            Self::Todo => "todo",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Missing or malformed user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty after trim.
    MissingField(&'static str),
    /// Field is present but cannot be parsed.
    Malformed { field: &'static str, value: String },
    /// Subject name already exists.
    DuplicateSubject(String),
    /// Target entity does not exist.
    NotFound { kind: EntityKind, id: String },
    /// Every id of this family has been handed out.
    IdsExhausted(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is missing"),
            Self::Malformed { field, value } => {
                write!(f, "field `{field}` has malformed value `{value}`")
            }
            Self::DuplicateSubject(name) => write!(f, "subject already exists: {name}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::IdsExhausted(kind) => write!(f, "no {kind} ids left to issue"),
        }
    }
}

impl Error for ValidationError {}

/// Broken or protected cross-entity references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferentialError {
    UnknownSubject(String),
    UnknownSemester(u64),
    /// Deletion refused because dependents still reference the entity.
    InUse {
        kind: EntityKind,
        key: String,
        lectures: usize,
        assignments: usize,
    },
}

impl Display for ReferentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSubject(name) => write!(f, "unknown subject: {name}"),
            Self::UnknownSemester(id) => write!(f, "unknown semester: {id}"),
            Self::InUse {
                kind,
                key,
                lectures,
                assignments,
            } => write!(
                f,
                "{kind} `{key}` is still referenced by {lectures} lecture(s) and {assignments} assignment(s)"
            ),
        }
    }
}

impl Error for ReferentialError {}

/// Values outside their permitted range.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeError {
    /// Numeric grade outside `0..=100`.
    GradeOutOfRange(f64),
    /// Semester ends before it starts.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl Display for RangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GradeOutOfRange(value) => {
                write!(f, "grade {value} is outside the range 0..=100")
            }
            Self::InvalidDateRange { start, end } => {
                write!(f, "end date {end} is before start date {start}")
            }
        }
    }
}

impl Error for RangeError {}

/// Storage or serialization failure.
#[derive(Debug)]
pub enum PersistenceError {
    /// Backend rejected a load or save.
    Backend(String),
    /// Value could not be encoded for its storage key.
    Serialize { key: &'static str, message: String },
    Db(DbError),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "storage backend failure: {message}"),
            Self::Serialize { key, message } => {
                write!(f, "failed to serialize `{key}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Umbrella error returned by planner operations.
#[derive(Debug)]
pub enum PlannerError {
    Validation(ValidationError),
    Referential(ReferentialError),
    Range(RangeError),
    Persistence(PersistenceError),
}

impl PlannerError {
    /// Stable short code for UI/diagnostic mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Referential(_) => "referential_error",
            Self::Range(_) => "range_error",
            Self::Persistence(_) => "persistence_error",
        }
    }
}

impl Display for PlannerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Referential(err) => write!(f, "{err}"),
            Self::Range(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Referential(err) => Some(err),
            Self::Range(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ValidationError> for PlannerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReferentialError> for PlannerError {
    fn from(value: ReferentialError) -> Self {
        Self::Referential(value)
    }
}

impl From<RangeError> for PlannerError {
    fn from(value: RangeError) -> Self {
        Self::Range(value)
    }
}

impl From<PersistenceError> for PlannerError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}
