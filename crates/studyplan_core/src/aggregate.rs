//! Dashboard counters, grade averages and the simplified GPA.
//!
//! # Responsibility
//! - Provide one shared percentage-to-letter mapping for every caller.
//! - Aggregate numeric grades only; letter grades are listed but never
//!   averaged.
//!
//! # Invariants
//! - `DashboardCounters::total == completed + pending` always holds.
//! - Averages are `None` (not zero) when no numeric grade is present.
//! - GPA is the unweighted mean of per-subject band points.

use crate::model::{Assignment, AssignmentId, Grade};
use crate::views::filters::SemesterFilter;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounters {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Counts assignments; `pending` is derived as `total - completed`.
pub fn dashboard_counters(assignments: &[Assignment]) -> DashboardCounters {
    let total = assignments.len();
    let completed = assignments.iter().filter(|a| a.is_completed()).count();
    DashboardCounters {
        total,
        completed,
        pending: total - completed,
    }
}

/// Grade band on the fixed 90/80/70/60 thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Self::A
        } else if percentage >= 80.0 {
            Self::B
        } else if percentage >= 70.0 {
            Self::C
        } else if percentage >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    /// Four-point value of the band.
    pub fn points(self) -> f64 {
        match self {
            Self::A => 4.0,
            Self::B => 3.0,
            Self::C => 2.0,
            Self::D => 1.0,
            Self::F => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl Display for LetterGrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn letter_grade(percentage: f64) -> LetterGrade {
    LetterGrade::from_percentage(percentage)
}

/// Mean of the numeric grades among `assignments`.
pub fn average_grade<'a>(assignments: impl IntoIterator<Item = &'a Assignment>) -> Option<f64> {
    let (sum, count) = assignments
        .into_iter()
        .filter_map(Assignment::numeric_grade)
        .fold((0.0_f64, 0_usize), |(sum, count), grade| {
            (sum + grade, count + 1)
        });
    (count > 0).then(|| sum / count as f64)
}

pub fn per_subject_average(subject: &str, assignments: &[Assignment]) -> Option<f64> {
    average_grade(assignments.iter().filter(|a| a.subject == subject))
}

/// Unweighted mean of band points over subjects with a numeric grade.
///
/// Returns `None` when no subject has a numeric grade.
pub fn gpa(assignments: &[Assignment]) -> Option<f64> {
    let points: Vec<f64> = subjects_in_order(assignments.iter())
        .into_iter()
        .filter_map(|subject| per_subject_average(subject, assignments))
        .map(|average| letter_grade(average).points())
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(points.iter().sum::<f64>() / points.len() as f64)
}

/// One graded assignment line in the grades view.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEntry {
    pub assignment_id: AssignmentId,
    pub title: String,
    pub grade: Grade,
}

/// Per-subject card in the grades view.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectGrades {
    pub subject: String,
    /// Mean of numeric grades; `None` when only letter grades exist.
    pub average: Option<f64>,
    pub letter: Option<LetterGrade>,
    pub entries: Vec<GradeEntry>,
}

/// Grades tab summary for one semester scope.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeReport {
    pub average: Option<f64>,
    /// Assignments carrying any grade, numeric or letter.
    pub graded_count: usize,
    pub gpa: Option<f64>,
    /// Subjects in first-seen order.
    pub subjects: Vec<SubjectGrades>,
}

pub fn grade_report(assignments: &[Assignment], semester: SemesterFilter) -> GradeReport {
    let graded: Vec<Assignment> = assignments
        .iter()
        .filter(|a| a.grade.is_some() && semester.matches(a.semester_id))
        .cloned()
        .collect();

    let subjects = subjects_in_order(graded.iter())
        .into_iter()
        .map(|subject| {
            let average = per_subject_average(subject, &graded);
            SubjectGrades {
                subject: subject.to_string(),
                average,
                letter: average.map(letter_grade),
                entries: graded
                    .iter()
                    .filter(|a| a.subject == subject)
                    .filter_map(|a| {
                        a.grade.clone().map(|grade| GradeEntry {
                            assignment_id: a.id,
                            title: a.title.clone(),
                            grade,
                        })
                    })
                    .collect(),
            }
        })
        .collect();

    GradeReport {
        average: average_grade(&graded),
        graded_count: graded.len(),
        gpa: gpa(&graded),
        subjects,
    }
}

fn subjects_in_order<'a>(assignments: impl Iterator<Item = &'a Assignment>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for assignment in assignments {
        if !seen.contains(&assignment.subject.as_str()) {
            seen.push(assignment.subject.as_str());
        }
    }
    seen
}
