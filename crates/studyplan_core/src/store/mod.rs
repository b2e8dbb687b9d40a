//! Canonical in-memory entity store.
//!
//! # Responsibility
//! - Own every planner collection and issue identifiers.
//! - Apply validated mutations atomically.
//! - Track which collections changed since the last `take_changes`.
//!
//! # Invariants
//! - Validation and reference checks run before any collection is altered;
//!   a returned error means the store is unchanged.
//! - Every lecture/assignment references an existing subject and semester.
//! - The activity log never holds more than `ACTIVITY_LOG_CAPACITY` entries.
//!
//! # See also
//! - `crate::integrity` for deletion policy.

pub mod ids;

use crate::error::{EntityKind, PlannerResult, ValidationError};
use crate::integrity::{
    authorize_deletion, check_references, semester_dependents, subject_dependents,
    DeletePolicy, Dependents,
};
use crate::model::input::required;
use crate::model::personal::UNASSIGNED_TODO_ID;
use crate::model::{
    ActivityLogEntry, Assignment, AssignmentId, AssignmentStatus, Grade, Lecture, LectureId,
    NewAssignment, NewLecture, NewSemester, Profile, ProfileUpdate, Semester, SemesterId, Todo,
    TodoId,
};
use crate::notify::{ChangeSet, Collection, Revisions};
use chrono::NaiveDateTime;
use ids::{IdKind, IdSequence};
use log::{info, warn};
use std::collections::VecDeque;

/// Most recent activity entries kept in the ring buffer.
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

/// Plain collection bundle used for loading and inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub subjects: Vec<String>,
    pub semesters: Vec<Semester>,
    pub lectures: Vec<Lecture>,
    pub assignments: Vec<Assignment>,
    pub todos: Vec<Todo>,
    pub profile: Profile,
    pub activity: Vec<ActivityLogEntry>,
    pub dark_mode: bool,
    /// `None` when no counters were persisted.
    pub ids: Option<IdSequence>,
}

/// Counts of dependents removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub lectures_removed: usize,
    pub assignments_removed: usize,
}

/// Owned planner state; passed explicitly to every operation.
#[derive(Debug, Clone)]
pub struct PlannerStore {
    subjects: Vec<String>,
    semesters: Vec<Semester>,
    lectures: Vec<Lecture>,
    assignments: Vec<Assignment>,
    todos: Vec<Todo>,
    profile: Profile,
    activity: VecDeque<ActivityLogEntry>,
    dark_mode: bool,
    ids: IdSequence,
    policy: DeletePolicy,
    revisions: Revisions,
    pending: ChangeSet,
}

impl PlannerStore {
    pub fn new(policy: DeletePolicy) -> Self {
        Self::from_snapshot(StoreSnapshot::default(), policy)
    }

    /// Builds a store from loaded collections.
    ///
    /// Id counters are raised past every existing id so loaded data written
    /// without counters can never collide with new ids. To-dos saved without
    /// an id get fresh ones, and both keys are left pending for write-back.
    pub fn from_snapshot(snapshot: StoreSnapshot, policy: DeletePolicy) -> Self {
        let StoreSnapshot {
            subjects,
            semesters,
            lectures,
            assignments,
            mut todos,
            profile,
            activity,
            dark_mode,
            ids,
        } = snapshot;

        let mut ids = ids.unwrap_or_default();
        ids.raise_to_cover(IdKind::Semester, semesters.iter().map(|s| s.id).max());
        ids.raise_to_cover(IdKind::Lecture, lectures.iter().map(|l| l.id).max());
        ids.raise_to_cover(IdKind::Assignment, assignments.iter().map(|a| a.id).max());
        ids.raise_to_cover(IdKind::Todo, todos.iter().map(|t| t.id).max());
        ids.raise_to_cover(IdKind::Activity, activity.iter().map(|e| e.id).max());

        let mut pending = ChangeSet::new();
        if todos.iter().any(|t| t.id == UNASSIGNED_TODO_ID) {
            let before = todos.len();
            todos.retain_mut(|todo| {
                if todo.id != UNASSIGNED_TODO_ID {
                    return true;
                }
                match ids.issue(IdKind::Todo) {
                    Some(id) => {
                        todo.id = id;
                        true
                    }
                    None => false,
                }
            });
            info!(
                "event=todo_ids_assigned module=store status=ok dropped={}",
                before - todos.len()
            );
            pending.insert(Collection::Todos);
            pending.insert(Collection::IdSequence);
        }

        for kind in IdKind::ALL {
            if ids.is_exhausted(kind) {
                warn!(
                    "event=id_sequence module=store status=exhausted kind={}",
                    kind.as_str()
                );
            }
        }

        let mut activity: VecDeque<ActivityLogEntry> = activity.into_iter().collect();
        while activity.len() > ACTIVITY_LOG_CAPACITY {
            activity.pop_front();
        }

        Self {
            subjects,
            semesters,
            lectures,
            assignments,
            todos,
            profile,
            activity,
            dark_mode,
            ids,
            policy,
            revisions: Revisions::default(),
            pending,
        }
    }

    pub fn policy(&self) -> DeletePolicy {
        self.policy
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn semesters(&self) -> &[Semester] {
        &self.semesters
    }

    pub fn lectures(&self) -> &[Lecture] {
        &self.lectures
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Activity entries, oldest first.
    pub fn activity(&self) -> impl DoubleEndedIterator<Item = &ActivityLogEntry> {
        self.activity.iter()
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn ids(&self) -> &IdSequence {
        &self.ids
    }

    pub fn semester(&self, id: SemesterId) -> Option<&Semester> {
        self.semesters.iter().find(|s| s.id == id)
    }

    pub fn lecture(&self, id: LectureId) -> Option<&Lecture> {
        self.lectures.iter().find(|l| l.id == id)
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn has_subject(&self, name: &str) -> bool {
        self.subjects.iter().any(|s| s == name)
    }

    pub fn revisions(&self) -> &Revisions {
        &self.revisions
    }

    /// Returns and clears the collections touched since the previous call.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.pending)
    }

    pub fn create_subject(&mut self, name: &str) -> PlannerResult<String> {
        let name = required("name", name)?;
        if self.has_subject(&name) {
            return Err(ValidationError::DuplicateSubject(name).into());
        }
        self.subjects.push(name.clone());
        self.mark(Collection::Subjects);
        Ok(name)
    }

    pub fn create_semester(&mut self, input: &NewSemester) -> PlannerResult<Semester> {
        let draft = input.parse()?;
        let semester = draft.into_semester(self.issue(IdKind::Semester)?);
        self.semesters.push(semester.clone());
        self.mark(Collection::Semesters);
        Ok(semester)
    }

    pub fn create_lecture(&mut self, input: &NewLecture) -> PlannerResult<Lecture> {
        let draft = input.parse()?;
        check_references(
            &self.subjects,
            &self.semesters,
            &draft.subject,
            draft.semester_id,
        )?;
        let lecture = draft.into_lecture(self.issue(IdKind::Lecture)?);
        self.lectures.push(lecture.clone());
        self.mark(Collection::Lectures);
        Ok(lecture)
    }

    pub fn create_assignment(&mut self, input: &NewAssignment) -> PlannerResult<Assignment> {
        let draft = input.parse()?;
        check_references(
            &self.subjects,
            &self.semesters,
            &draft.subject,
            draft.semester_id,
        )?;
        let assignment = draft.into_assignment(self.issue(IdKind::Assignment)?);
        self.assignments.push(assignment.clone());
        self.mark(Collection::Assignments);
        Ok(assignment)
    }

    /// Sets status explicitly. The grade is left untouched.
    pub fn update_assignment_status(
        &mut self,
        id: AssignmentId,
        status: AssignmentStatus,
    ) -> PlannerResult<Assignment> {
        let assignment = self.assignment_mut(id)?;
        assignment.status = status;
        let updated = assignment.clone();
        self.mark(Collection::Assignments);
        Ok(updated)
    }

    /// Flips pending/completed. Returning to pending clears the grade.
    pub fn toggle_assignment_status(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        let assignment = self.assignment_mut(id)?;
        assignment.status = assignment.status.toggled();
        if assignment.status == AssignmentStatus::Pending {
            assignment.grade = None;
        }
        let updated = assignment.clone();
        self.mark(Collection::Assignments);
        Ok(updated)
    }

    pub fn update_assignment_grade(
        &mut self,
        id: AssignmentId,
        grade: Grade,
    ) -> PlannerResult<Assignment> {
        grade.validate()?;
        let assignment = self.assignment_mut(id)?;
        assignment.grade = Some(grade);
        let updated = assignment.clone();
        self.mark(Collection::Assignments);
        Ok(updated)
    }

    pub fn clear_assignment_grade(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        let assignment = self.assignment_mut(id)?;
        assignment.grade = None;
        let updated = assignment.clone();
        self.mark(Collection::Assignments);
        Ok(updated)
    }

    pub fn delete_assignment(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        let index = self
            .assignments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found(EntityKind::Assignment, id))?;
        let removed = self.assignments.remove(index);
        self.mark(Collection::Assignments);
        Ok(removed)
    }

    pub fn delete_lecture(&mut self, id: LectureId) -> PlannerResult<Lecture> {
        let index = self
            .lectures
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| not_found(EntityKind::Lecture, id))?;
        let removed = self.lectures.remove(index);
        self.mark(Collection::Lectures);
        Ok(removed)
    }

    /// Deletes a subject under the store's `DeletePolicy`.
    pub fn delete_subject(&mut self, name: &str) -> PlannerResult<DeletionReport> {
        let name = name.trim();
        if !self.has_subject(name) {
            return Err(ValidationError::NotFound {
                kind: EntityKind::Subject,
                id: name.to_string(),
            }
            .into());
        }
        let dependents = subject_dependents(name, &self.lectures, &self.assignments);
        let doomed = authorize_deletion(self.policy, EntityKind::Subject, name, dependents)?;
        let report = self.remove_dependents(&doomed);
        self.subjects.retain(|s| s != name);
        self.mark(Collection::Subjects);
        Ok(report)
    }

    /// Deletes a semester under the store's `DeletePolicy`.
    pub fn delete_semester(&mut self, id: SemesterId) -> PlannerResult<DeletionReport> {
        if self.semester(id).is_none() {
            return Err(not_found(EntityKind::Semester, id));
        }
        let dependents = semester_dependents(id, &self.lectures, &self.assignments);
        let doomed =
            authorize_deletion(self.policy, EntityKind::Semester, &id.to_string(), dependents)?;
        let report = self.remove_dependents(&doomed);
        self.semesters.retain(|s| s.id != id);
        self.mark(Collection::Semesters);
        Ok(report)
    }

    pub fn add_todo(&mut self, text: &str) -> PlannerResult<Todo> {
        let text = required("text", text)?;
        let todo = Todo {
            id: self.issue(IdKind::Todo)?,
            text,
            completed: false,
        };
        self.todos.push(todo.clone());
        self.mark(Collection::Todos);
        Ok(todo)
    }

    pub fn set_todo_completed(&mut self, id: TodoId, completed: bool) -> PlannerResult<Todo> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(EntityKind::Todo, id))?;
        todo.completed = completed;
        let updated = todo.clone();
        self.mark(Collection::Todos);
        Ok(updated)
    }

    pub fn delete_todo(&mut self, id: TodoId) -> PlannerResult<Todo> {
        let index = self
            .todos
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(EntityKind::Todo, id))?;
        let removed = self.todos.remove(index);
        self.mark(Collection::Todos);
        Ok(removed)
    }

    pub fn update_profile(&mut self, update: &ProfileUpdate) -> PlannerResult<Profile> {
        self.profile = update.apply(&self.profile)?;
        self.mark(Collection::Profile);
        Ok(self.profile.clone())
    }

    pub fn set_profile_picture(&mut self, picture_ref: &str) -> PlannerResult<()> {
        self.profile.picture_ref = required("pictureRef", picture_ref)?;
        self.mark(Collection::Profile);
        Ok(())
    }

    pub fn set_dark_mode(&mut self, enabled: bool) {
        self.dark_mode = enabled;
        self.mark(Collection::Preferences);
    }

    /// Appends one entry, evicting the oldest beyond capacity.
    ///
    /// Returns `None` without recording once activity ids are exhausted; the
    /// log is informational and never blocks a mutation.
    pub fn record_activity(
        &mut self,
        message: impl Into<String>,
        at: NaiveDateTime,
    ) -> Option<ActivityLogEntry> {
        let Ok(id) = self.issue(IdKind::Activity) else {
            warn!("event=activity_log module=store status=skipped reason=ids_exhausted");
            return None;
        };
        let entry = ActivityLogEntry {
            id,
            message: message.into(),
            timestamp: at,
        };
        self.activity.push_back(entry.clone());
        while self.activity.len() > ACTIVITY_LOG_CAPACITY {
            self.activity.pop_front();
        }
        self.mark(Collection::ActivityLog);
        Some(entry)
    }

    fn assignment_mut(&mut self, id: AssignmentId) -> PlannerResult<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found(EntityKind::Assignment, id))
    }

    fn remove_dependents(&mut self, doomed: &Dependents) -> DeletionReport {
        let report = DeletionReport {
            lectures_removed: doomed.lecture_ids.len(),
            assignments_removed: doomed.assignment_ids.len(),
        };
        if report.lectures_removed > 0 {
            self.lectures.retain(|l| !doomed.lecture_ids.contains(&l.id));
            self.mark(Collection::Lectures);
        }
        if report.assignments_removed > 0 {
            self.assignments
                .retain(|a| !doomed.assignment_ids.contains(&a.id));
            self.mark(Collection::Assignments);
        }
        report
    }

    fn issue(&mut self, kind: IdKind) -> PlannerResult<u64> {
        let id = self
            .ids
            .issue(kind)
            .ok_or(ValidationError::IdsExhausted(kind.as_str()))?;
        self.mark(Collection::IdSequence);
        Ok(id)
    }

    fn mark(&mut self, collection: Collection) {
        self.revisions.bump(collection);
        self.pending.insert(collection);
    }
}

impl Default for PlannerStore {
    fn default() -> Self {
        Self::new(DeletePolicy::default())
    }
}

fn not_found(kind: EntityKind, id: u64) -> crate::error::PlannerError {
    ValidationError::NotFound {
        kind,
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::{PlannerStore, StoreSnapshot, ACTIVITY_LOG_CAPACITY};
    use crate::integrity::DeletePolicy;
    use crate::model::Todo;
    use crate::notify::Collection;
    use chrono::NaiveDate;

    #[test]
    fn activity_log_is_bounded() {
        let mut store = PlannerStore::default();
        let at = NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        for n in 0..15 {
            store.record_activity(format!("entry {n}"), at);
        }
        let messages: Vec<_> = store.activity().map(|e| e.message.clone()).collect();
        assert_eq!(messages.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(messages.first().map(String::as_str), Some("entry 5"));
        assert_eq!(messages.last().map(String::as_str), Some("entry 14"));
    }

    #[test]
    fn snapshot_counters_cover_loaded_ids() {
        let snapshot = StoreSnapshot {
            todos: vec![Todo {
                id: 7,
                text: "read".to_string(),
                completed: false,
            }],
            ..StoreSnapshot::default()
        };
        let mut store = PlannerStore::from_snapshot(snapshot, DeletePolicy::Cascade);
        let todo = store.add_todo("write").unwrap();
        assert_eq!(todo.id, 8);
    }

    #[test]
    fn take_changes_drains_pending_set() {
        let mut store = PlannerStore::default();
        store.add_todo("stretch").unwrap();
        let changes = store.take_changes();
        assert!(changes.contains(Collection::Todos));
        assert!(changes.contains(Collection::IdSequence));
        assert!(store.take_changes().is_empty());
    }

    #[test]
    fn failed_mutation_leaves_no_pending_changes() {
        let mut store = PlannerStore::default();
        assert!(store.add_todo("   ").is_err());
        assert!(store.take_changes().is_empty());
        assert_eq!(store.revisions().get(Collection::Todos), 0);
    }
}
