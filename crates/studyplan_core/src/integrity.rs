//! Referential integrity between subjects, semesters and their dependents.
//!
//! # Responsibility
//! - Verify that new lectures/assignments reference existing parents.
//! - Decide what happens to dependents when a subject or semester is deleted.
//! - Audit loaded data for dangling references.
//!
//! # Invariants
//! - One `DeletePolicy` governs both subject and semester deletion.
//! - Under `Cascade`, dependents are removed together with the parent.
//! - Under `Block`, deletion of a referenced parent is refused and nothing
//!   is removed.

use crate::error::{EntityKind, ReferentialError, ValidationError};
use crate::model::{Assignment, AssignmentId, Lecture, LectureId, Semester, SemesterId};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Deletion policy for referenced parents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Remove dependent lectures and assignments first.
    #[default]
    Cascade,
    /// Refuse the deletion with `ReferentialError::InUse`.
    Block,
}

impl DeletePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Block => "block",
        }
    }
}

impl Display for DeletePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "block" => Ok(Self::Block),
            _ => Err(ValidationError::Malformed {
                field: "deletePolicy",
                value: value.to_string(),
            }),
        }
    }
}

/// Lectures and assignments referencing one parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    pub lecture_ids: Vec<LectureId>,
    pub assignment_ids: Vec<AssignmentId>,
}

impl Dependents {
    pub fn is_empty(&self) -> bool {
        self.lecture_ids.is_empty() && self.assignment_ids.is_empty()
    }
}

pub fn subject_dependents(
    subject: &str,
    lectures: &[Lecture],
    assignments: &[Assignment],
) -> Dependents {
    Dependents {
        lecture_ids: lectures
            .iter()
            .filter(|l| l.subject == subject)
            .map(|l| l.id)
            .collect(),
        assignment_ids: assignments
            .iter()
            .filter(|a| a.subject == subject)
            .map(|a| a.id)
            .collect(),
    }
}

pub fn semester_dependents(
    semester_id: SemesterId,
    lectures: &[Lecture],
    assignments: &[Assignment],
) -> Dependents {
    Dependents {
        lecture_ids: lectures
            .iter()
            .filter(|l| l.semester_id == semester_id)
            .map(|l| l.id)
            .collect(),
        assignment_ids: assignments
            .iter()
            .filter(|a| a.semester_id == semester_id)
            .map(|a| a.id)
            .collect(),
    }
}

/// Applies `policy` to a pending deletion.
///
/// Returns the dependents that must be removed along with the parent
/// (always empty under `Block`).
///
/// # Errors
/// - `ReferentialError::InUse` under `Block` when `dependents` is non-empty.
pub fn authorize_deletion(
    policy: DeletePolicy,
    kind: EntityKind,
    key: &str,
    dependents: Dependents,
) -> Result<Dependents, ReferentialError> {
    if dependents.is_empty() {
        return Ok(dependents);
    }
    match policy {
        DeletePolicy::Cascade => Ok(dependents),
        DeletePolicy::Block => Err(ReferentialError::InUse {
            kind,
            key: key.to_string(),
            lectures: dependents.lecture_ids.len(),
            assignments: dependents.assignment_ids.len(),
        }),
    }
}

/// Checks that both parents of a new lecture/assignment exist.
pub fn check_references(
    subjects: &[String],
    semesters: &[Semester],
    subject: &str,
    semester_id: SemesterId,
) -> Result<(), ReferentialError> {
    if !subjects.iter().any(|s| s == subject) {
        return Err(ReferentialError::UnknownSubject(subject.to_string()));
    }
    if !semesters.iter().any(|s| s.id == semester_id) {
        return Err(ReferentialError::UnknownSemester(semester_id));
    }
    Ok(())
}

/// Missing parent found by `find_dangling`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingParent {
    Subject(String),
    Semester(SemesterId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub kind: EntityKind,
    pub id: u64,
    pub missing: MissingParent,
}

/// Lists every lecture/assignment whose subject or semester is missing.
pub fn find_dangling(
    subjects: &[String],
    semesters: &[Semester],
    lectures: &[Lecture],
    assignments: &[Assignment],
) -> Vec<DanglingReference> {
    let refs = lectures
        .iter()
        .map(|l| (EntityKind::Lecture, l.id, l.subject.as_str(), l.semester_id))
        .chain(
            assignments
                .iter()
                .map(|a| (EntityKind::Assignment, a.id, a.subject.as_str(), a.semester_id)),
        );

    let mut dangling = Vec::new();
    for (kind, id, subject, semester_id) in refs {
        if let Err(err) = check_references(subjects, semesters, subject, semester_id) {
            let missing = match err {
                ReferentialError::UnknownSubject(name) => MissingParent::Subject(name),
                _ => MissingParent::Semester(semester_id),
            };
            dangling.push(DanglingReference { kind, id, missing });
        }
    }
    dangling
}
