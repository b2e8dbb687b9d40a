//! Planner facade over the entity store.
//!
//! # Responsibility
//! - Load the store from the key-value collaborator once at startup.
//! - Run every mutation as validate -> mutate -> record activity ->
//!   write-through -> publish.
//! - Serve list, dashboard, grade and calendar views with memoized
//!   aggregates.
//!
//! # Invariants
//! - A rejected mutation leaves the store, backend and listeners untouched.
//! - A committed mutation is never rolled back by a persistence failure;
//!   failing keys stay dirty until a later write succeeds.
//! - Memoized views are keyed by collection revisions and never stale.
//!
//! # See also
//! - `crate::persist` for blob layout.

use crate::aggregate::{dashboard_counters, grade_report, DashboardCounters, GradeReport};
use crate::error::{EntityKind, PersistenceError, PlannerResult, ValidationError};
use crate::integrity::{find_dangling, DeletePolicy, MissingParent};
use crate::model::{
    ActivityLogEntry, Assignment, AssignmentId, AssignmentStatus, Grade, Lecture, LectureId,
    NewAssignment, NewLecture, NewSemester, Profile, ProfileUpdate, Semester, SemesterId, Todo,
    TodoId,
};
use crate::notify::{ChangeBus, ChangeEvent, ChangeListener, Collection, ListenerId, Memo};
use crate::persist::{load_snapshot, save_collection, storage_key, KeyValueStore};
use crate::service::clock::{Clock, SystemClock};
use crate::store::{DeletionReport, PlannerStore};
use crate::views::calendar::{calendar_events, fixed_holidays, CalendarEvent, EventRef, Holiday};
use crate::views::filters::{
    filter_assignments, filter_lectures, today_schedule, upcoming_deadlines, SemesterFilter,
    StatusFilter, DEFAULT_UPCOMING_LIMIT,
};
use chrono::{Datelike, NaiveDate};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::time::Instant;

/// Behavior knobs fixed for the lifetime of a planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    pub delete_policy: DeletePolicy,
    pub upcoming_limit: usize,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
        }
    }
}

/// Entity behind a calendar event id.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTarget<'a> {
    Lecture(&'a Lecture),
    Assignment(&'a Assignment),
    Holiday(Holiday),
}

pub struct Planner<B: KeyValueStore, C: Clock = SystemClock> {
    store: PlannerStore,
    backend: B,
    clock: C,
    bus: ChangeBus,
    dirty: BTreeSet<Collection>,
    options: PlannerOptions,
    dashboard_memo: Memo<(), DashboardCounters>,
    grades_memo: Memo<SemesterFilter, GradeReport>,
}

impl<B: KeyValueStore> Planner<B, SystemClock> {
    /// Opens a planner reading "now" from the local system clock.
    pub fn open_with_system_clock(backend: B, options: PlannerOptions) -> Self {
        Self::open(backend, SystemClock, options)
    }
}

impl<B: KeyValueStore, C: Clock> Planner<B, C> {
    /// Loads every collection from `backend`.
    ///
    /// Loading never fails: unreadable keys fall back to defaults. Dangling
    /// references found in loaded data are logged, not repaired.
    pub fn open(backend: B, clock: C, options: PlannerOptions) -> Self {
        let started_at = Instant::now();
        let mut store = PlannerStore::from_snapshot(load_snapshot(&backend), options.delete_policy);
        let upgraded = store.take_changes();

        let dangling = find_dangling(
            store.subjects(),
            store.semesters(),
            store.lectures(),
            store.assignments(),
        );
        for reference in &dangling {
            let missing = match reference.missing {
                MissingParent::Subject(_) => "subject",
                MissingParent::Semester(_) => "semester",
            };
            warn!(
                "event=integrity_audit module=service status=dangling kind={} id={} missing={missing}",
                reference.kind, reference.id
            );
        }

        info!(
            "event=planner_open module=service status=ok policy={} subjects={} semesters={} lectures={} assignments={} todos={} dangling={} duration_ms={}",
            options.delete_policy,
            store.subjects().len(),
            store.semesters().len(),
            store.lectures().len(),
            store.assignments().len(),
            store.todos().len(),
            dangling.len(),
            started_at.elapsed().as_millis()
        );

        let mut planner = Self {
            store,
            backend,
            clock,
            bus: ChangeBus::new(),
            dirty: BTreeSet::new(),
            options,
            dashboard_memo: Memo::new(),
            grades_memo: Memo::new(),
        };
        if !upgraded.is_empty() {
            let failures = planner.write_through(upgraded.collections().collect());
            info!(
                "event=planner_upgrade module=service status={} collections={}",
                if failures.is_empty() { "ok" } else { "deferred" },
                upgraded.collections().count()
            );
        }
        planner
    }

    pub fn store(&self) -> &PlannerStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn options(&self) -> PlannerOptions {
        self.options
    }

    pub fn subscribe(&mut self, listener: impl ChangeListener + 'static) -> ListenerId {
        self.bus.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Storage keys whose latest value has not been saved yet.
    pub fn dirty_keys(&self) -> Vec<&'static str> {
        self.dirty.iter().map(|c| storage_key(*c)).collect()
    }

    /// Retries every dirty key.
    ///
    /// # Errors
    /// - Returns the first failure; keys that did save are cleared either way.
    pub fn flush(&mut self) -> Result<(), PersistenceError> {
        let pending: Vec<Collection> = self.dirty.iter().copied().collect();
        let mut failures = self.write_through(pending);
        for (key, err) in &failures {
            self.bus.publish(&ChangeEvent::PersistenceFailed {
                key: *key,
                message: err.to_string(),
            });
        }
        if failures.is_empty() {
            info!("event=flush module=service status=ok");
            Ok(())
        } else {
            Err(failures.remove(0).1)
        }
    }

    pub fn create_subject(&mut self, name: &str) -> PlannerResult<String> {
        self.commit(
            "create_subject",
            |store| store.create_subject(name),
            |_| "Added subject".to_string(),
        )
    }

    pub fn create_semester(&mut self, input: &NewSemester) -> PlannerResult<Semester> {
        self.commit(
            "create_semester",
            |store| store.create_semester(input),
            |semester| format!("Added semester #{}", semester.id),
        )
    }

    pub fn create_lecture(&mut self, input: &NewLecture) -> PlannerResult<Lecture> {
        self.commit(
            "create_lecture",
            |store| store.create_lecture(input),
            |lecture| format!("Added lecture #{}", lecture.id),
        )
    }

    pub fn create_assignment(&mut self, input: &NewAssignment) -> PlannerResult<Assignment> {
        self.commit(
            "create_assignment",
            |store| store.create_assignment(input),
            |assignment| format!("Added assignment #{}", assignment.id),
        )
    }

    pub fn update_assignment_status(
        &mut self,
        id: AssignmentId,
        status: AssignmentStatus,
    ) -> PlannerResult<Assignment> {
        self.commit(
            "update_assignment_status",
            |store| store.update_assignment_status(id, status),
            |assignment| format!("Marked assignment #{} {}", assignment.id, status.as_str()),
        )
    }

    /// Flips pending/completed; returning to pending clears the grade.
    pub fn toggle_assignment_status(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        self.commit(
            "toggle_assignment_status",
            |store| store.toggle_assignment_status(id),
            |assignment| {
                format!(
                    "Marked assignment #{} {}",
                    assignment.id,
                    assignment.status.as_str()
                )
            },
        )
    }

    pub fn update_assignment_grade(
        &mut self,
        id: AssignmentId,
        grade: Grade,
    ) -> PlannerResult<Assignment> {
        self.commit(
            "update_assignment_grade",
            |store| store.update_assignment_grade(id, grade),
            |assignment| format!("Graded assignment #{}", assignment.id),
        )
    }

    /// Parses free grade text (`"95"`, `"87.5%"`, `"A+"`) and stores it.
    pub fn grade_assignment(&mut self, id: AssignmentId, text: &str) -> PlannerResult<Assignment> {
        let grade = Grade::parse(text)?;
        self.update_assignment_grade(id, grade)
    }

    pub fn clear_assignment_grade(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        self.commit(
            "clear_assignment_grade",
            |store| store.clear_assignment_grade(id),
            |assignment| format!("Cleared grade of assignment #{}", assignment.id),
        )
    }

    pub fn delete_assignment(&mut self, id: AssignmentId) -> PlannerResult<Assignment> {
        self.commit(
            "delete_assignment",
            |store| store.delete_assignment(id),
            |assignment| format!("Deleted assignment #{}", assignment.id),
        )
    }

    pub fn delete_lecture(&mut self, id: LectureId) -> PlannerResult<Lecture> {
        self.commit(
            "delete_lecture",
            |store| store.delete_lecture(id),
            |lecture| format!("Deleted lecture #{}", lecture.id),
        )
    }

    pub fn delete_subject(&mut self, name: &str) -> PlannerResult<DeletionReport> {
        self.commit(
            "delete_subject",
            |store| store.delete_subject(name),
            |report| describe_deletion("subject", report),
        )
    }

    pub fn delete_semester(&mut self, id: SemesterId) -> PlannerResult<DeletionReport> {
        self.commit(
            "delete_semester",
            |store| store.delete_semester(id),
            |report| describe_deletion(&format!("semester #{id}"), report),
        )
    }

    pub fn add_todo(&mut self, text: &str) -> PlannerResult<Todo> {
        self.commit(
            "add_todo",
            |store| store.add_todo(text),
            |todo| format!("Added todo #{}", todo.id),
        )
    }

    pub fn set_todo_completed(&mut self, id: TodoId, completed: bool) -> PlannerResult<Todo> {
        self.commit(
            "set_todo_completed",
            |store| store.set_todo_completed(id, completed),
            describe_todo,
        )
    }

    pub fn toggle_todo(&mut self, id: TodoId) -> PlannerResult<Todo> {
        self.commit(
            "toggle_todo",
            |store| {
                let completed = store
                    .todos()
                    .iter()
                    .find(|t| t.id == id)
                    .map(|t| !t.completed)
                    .ok_or_else(|| ValidationError::NotFound {
                        kind: EntityKind::Todo,
                        id: id.to_string(),
                    })?;
                store.set_todo_completed(id, completed)
            },
            describe_todo,
        )
    }

    pub fn delete_todo(&mut self, id: TodoId) -> PlannerResult<Todo> {
        self.commit(
            "delete_todo",
            |store| store.delete_todo(id),
            |todo| format!("Deleted todo #{}", todo.id),
        )
    }

    pub fn update_profile(&mut self, update: &ProfileUpdate) -> PlannerResult<Profile> {
        self.commit(
            "update_profile",
            |store| store.update_profile(update),
            |_| "Updated profile".to_string(),
        )
    }

    pub fn set_profile_picture(&mut self, picture_ref: &str) -> PlannerResult<()> {
        self.commit(
            "set_profile_picture",
            |store| store.set_profile_picture(picture_ref),
            |_| "Updated profile picture".to_string(),
        )
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> PlannerResult<bool> {
        self.commit(
            "set_dark_mode",
            |store| {
                store.set_dark_mode(enabled);
                Ok(enabled)
            },
            |enabled| {
                if *enabled {
                    "Enabled dark mode".to_string()
                } else {
                    "Disabled dark mode".to_string()
                }
            },
        )
    }

    /// Deletes the lecture or assignment behind a calendar event id.
    ///
    /// Holidays are static and cannot be deleted.
    pub fn delete_event(&mut self, event_id: &str) -> PlannerResult<EventRef> {
        let reference: EventRef = event_id.parse()?;
        match reference {
            EventRef::Lecture(id) => self.delete_lecture(id).map(|_| reference),
            EventRef::Assignment(id) => self.delete_assignment(id).map(|_| reference),
            EventRef::Holiday(_) => Err(ValidationError::Malformed {
                field: "eventId",
                value: event_id.to_string(),
            }
            .into()),
        }
    }

    pub fn subjects(&self) -> &[String] {
        self.store.subjects()
    }

    pub fn semesters(&self) -> &[Semester] {
        self.store.semesters()
    }

    pub fn todos(&self) -> &[Todo] {
        self.store.todos()
    }

    pub fn profile(&self) -> &Profile {
        self.store.profile()
    }

    pub fn dark_mode(&self) -> bool {
        self.store.dark_mode()
    }

    /// Activity entries, newest first.
    pub fn recent_activity(&self) -> Vec<&ActivityLogEntry> {
        self.store.activity().rev().collect()
    }

    pub fn list_assignments(
        &self,
        status: StatusFilter,
        semester: SemesterFilter,
    ) -> Vec<&Assignment> {
        filter_assignments(self.store.assignments(), status, semester, self.clock.now())
    }

    pub fn list_lectures(&self, semester: SemesterFilter) -> Vec<&Lecture> {
        filter_lectures(self.store.lectures(), semester)
    }

    pub fn upcoming_deadlines(&self) -> Vec<&Assignment> {
        upcoming_deadlines(
            self.store.assignments(),
            self.clock.now(),
            self.options.upcoming_limit,
        )
    }

    pub fn today_schedule(&self) -> Vec<&Lecture> {
        today_schedule(self.store.lectures(), self.clock.today())
    }

    pub fn dashboard(&self) -> DashboardCounters {
        let stamp = self.store.revisions().stamp(&[Collection::Assignments]);
        self.dashboard_memo
            .get_or_compute(&(), stamp, || dashboard_counters(self.store.assignments()))
    }

    pub fn grade_report(&self, semester: SemesterFilter) -> GradeReport {
        let stamp = self.store.revisions().stamp(&[Collection::Assignments]);
        self.grades_memo.get_or_compute(&semester, stamp, || {
            grade_report(self.store.assignments(), semester)
        })
    }

    /// Events for the calendar widget, with holidays covering every year
    /// spanned by a semester plus the current year.
    pub fn calendar_events(&self, semester: SemesterFilter) -> Vec<CalendarEvent> {
        let holidays = fixed_holidays(self.calendar_years());
        calendar_events(
            self.store.lectures(),
            self.store.assignments(),
            &holidays,
            semester,
        )
    }

    /// Maps a calendar event id back to the entity it was built from.
    pub fn resolve_event(&self, event_id: &str) -> PlannerResult<EventTarget<'_>> {
        let not_found = |kind: EntityKind, id: u64| ValidationError::NotFound {
            kind,
            id: id.to_string(),
        };
        match event_id.parse::<EventRef>()? {
            EventRef::Lecture(id) => self
                .store
                .lecture(id)
                .map(EventTarget::Lecture)
                .ok_or_else(|| not_found(EntityKind::Lecture, id).into()),
            EventRef::Assignment(id) => self
                .store
                .assignment(id)
                .map(EventTarget::Assignment)
                .ok_or_else(|| not_found(EntityKind::Assignment, id).into()),
            EventRef::Holiday(date) => holiday_on(date).map(EventTarget::Holiday).ok_or_else(|| {
                ValidationError::Malformed {
                    field: "eventId",
                    value: event_id.to_string(),
                }
                .into()
            }),
        }
    }

    fn calendar_years(&self) -> RangeInclusive<i32> {
        let this_year = self.clock.today().year();
        let first = self
            .store
            .semesters()
            .iter()
            .map(|s| s.start_date.year())
            .min()
            .map_or(this_year, |year| year.min(this_year));
        let last = self
            .store
            .semesters()
            .iter()
            .map(|s| s.end_date.year())
            .max()
            .map_or(this_year, |year| year.max(this_year));
        first..=last
    }

    fn commit<T>(
        &mut self,
        op: &'static str,
        mutate: impl FnOnce(&mut PlannerStore) -> PlannerResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> PlannerResult<T> {
        let started_at = Instant::now();
        let value = match mutate(&mut self.store) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=mutation module=service status=rejected op={op} code={}",
                    err.code()
                );
                return Err(err);
            }
        };

        let now = self.clock.now();
        self.store.record_activity(describe(&value), now);
        let changes = self.store.take_changes();
        let failures = self.write_through(changes.collections().collect());

        info!(
            "event=mutation module=service status=ok op={op} collections={} dirty={} duration_ms={}",
            changes.collections().count(),
            self.dirty.len(),
            started_at.elapsed().as_millis()
        );

        self.bus.publish(&ChangeEvent::Committed(changes));
        for (key, err) in failures {
            self.bus.publish(&ChangeEvent::PersistenceFailed {
                key,
                message: err.to_string(),
            });
        }
        Ok(value)
    }

    /// Saves `touched` plus every previously dirty key.
    fn write_through(
        &mut self,
        touched: Vec<Collection>,
    ) -> Vec<(&'static str, PersistenceError)> {
        let pending: BTreeSet<Collection> = touched
            .into_iter()
            .chain(self.dirty.iter().copied())
            .collect();

        let mut failures = Vec::new();
        for collection in pending {
            let key = storage_key(collection);
            match save_collection(&mut self.backend, &self.store, collection) {
                Ok(()) => {
                    self.dirty.remove(&collection);
                }
                Err(err) => {
                    error!("event=persist module=service status=error key={key} error={err}");
                    self.dirty.insert(collection);
                    failures.push((key, err));
                }
            }
        }
        failures
    }
}

fn holiday_on(date: NaiveDate) -> Option<Holiday> {
    fixed_holidays(date.year()..=date.year())
        .into_iter()
        .find(|holiday| holiday.date == date)
}

fn describe_deletion(target: &str, report: &DeletionReport) -> String {
    if report.lectures_removed == 0 && report.assignments_removed == 0 {
        format!("Deleted {target}")
    } else {
        format!(
            "Deleted {target} with {} lecture(s) and {} assignment(s)",
            report.lectures_removed, report.assignments_removed
        )
    }
}

fn describe_todo(todo: &Todo) -> String {
    if todo.completed {
        format!("Completed todo #{}", todo.id)
    } else {
        format!("Reopened todo #{}", todo.id)
    }
}
