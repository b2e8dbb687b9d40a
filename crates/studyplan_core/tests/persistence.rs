use chrono::NaiveDate;
use std::cell::RefCell;
use std::rc::Rc;
use studyplan_core::db::migrations::{current_user_version, latest_version};
use studyplan_core::persist::{load_snapshot, save_collection, storage_key};
use studyplan_core::store::{PlannerStore, StoreSnapshot};
use studyplan_core::aggregate::grade_report;
use studyplan_core::{
    ChangeEvent, Collection, DeletePolicy, FixedClock, Grade, KeyValueStore, MemoryKeyValueStore,
    NewAssignment, NewLecture, NewSemester, PersistenceError, Planner, PlannerError,
    PlannerOptions, SemesterFilter, SqliteKeyValueStore, ValidationError,
};

fn populated_store() -> PlannerStore {
    let mut store = PlannerStore::default();
    store.create_subject("Math").unwrap();
    let fall = store
        .create_semester(&NewSemester {
            name: "Fall".to_string(),
            start_date: "2025-08-01".to_string(),
            end_date: "2025-12-15".to_string(),
        })
        .unwrap()
        .id;
    store
        .create_lecture(&NewLecture {
            title: "Limits".to_string(),
            subject: "Math".to_string(),
            semester_id: Some(fall),
            date: "2025-09-02".to_string(),
            time: "09:15".to_string(),
            location: "Room 12".to_string(),
            duration_minutes: Some(75),
        })
        .unwrap();
    let graded = store
        .create_assignment(&NewAssignment {
            title: "HW1".to_string(),
            subject: "Math".to_string(),
            semester_id: Some(fall),
            due_date: "2025-09-01".to_string(),
            due_time: "10:00".to_string(),
            priority: "high".to_string(),
        })
        .unwrap()
        .id;
    store.update_assignment_grade(graded, Grade::Numeric(95.0)).unwrap();
    let lettered = store
        .create_assignment(&NewAssignment {
            title: "Essay".to_string(),
            subject: "Math".to_string(),
            semester_id: Some(fall),
            due_date: "2025-10-01".to_string(),
            due_time: "23:59".to_string(),
            priority: "low".to_string(),
        })
        .unwrap()
        .id;
    store
        .update_assignment_grade(lettered, Grade::Letter("A-".to_string()))
        .unwrap();
    store.add_todo("Buy notebook").unwrap();
    store.set_dark_mode(true);
    store.record_activity(
        "Added assignment #1",
        NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
    );
    store
}

fn monday() -> FixedClock {
    FixedClock::new(
        NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
    )
}

fn save_all<B: KeyValueStore>(backend: &mut B, store: &PlannerStore) {
    for collection in Collection::ALL {
        save_collection(backend, store, collection).unwrap();
    }
}

fn assert_same_state(loaded: &StoreSnapshot, store: &PlannerStore) {
    assert_eq!(loaded.subjects, store.subjects());
    assert_eq!(loaded.semesters, store.semesters());
    assert_eq!(loaded.lectures, store.lectures());
    assert_eq!(loaded.assignments, store.assignments());
    assert_eq!(loaded.todos, store.todos());
    assert_eq!(&loaded.profile, store.profile());
    assert_eq!(
        loaded.activity,
        store.activity().cloned().collect::<Vec<_>>()
    );
    assert_eq!(loaded.dark_mode, store.dark_mode());
    assert_eq!(loaded.ids.as_ref(), Some(store.ids()));
}

#[test]
fn memory_backend_round_trips_every_collection() {
    let store = populated_store();
    let mut backend = MemoryKeyValueStore::new();
    save_all(&mut backend, &store);
    assert_same_state(&load_snapshot(&backend), &store);
}

#[test]
fn sqlite_file_backend_round_trips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.sqlite3");
    let store = populated_store();
    {
        let mut backend = SqliteKeyValueStore::open(&path).unwrap();
        save_all(&mut backend, &store);
    }
    let reopened = SqliteKeyValueStore::open(&path).unwrap();
    assert_eq!(
        current_user_version(reopened.connection()).unwrap(),
        latest_version()
    );
    assert_same_state(&load_snapshot(&reopened), &store);
}

#[test]
fn persisted_counters_prevent_id_reuse_after_restart() {
    let mut backend = MemoryKeyValueStore::new();
    let mut store = PlannerStore::default();
    let first = store.add_todo("one").unwrap();
    let second = store.add_todo("two").unwrap();
    store.delete_todo(second.id).unwrap();
    save_all(&mut backend, &store);

    let mut restored = PlannerStore::from_snapshot(load_snapshot(&backend), DeletePolicy::Cascade);
    let third = restored.add_todo("three").unwrap();
    assert!(third.id > second.id);
    assert!(third.id > first.id);
}

#[test]
fn legacy_numeric_grade_strings_load_as_numeric() {
    let mut backend = MemoryKeyValueStore::new();
    backend
        .save(
            "assignments",
            r#"[{"id":3,"title":"HW","subject":"Math","semesterId":1,"dueDate":"2025-09-01","dueTime":"10:00","priority":"medium","status":"completed","grade":"88"}]"#,
        )
        .unwrap();
    let snapshot = load_snapshot(&backend);
    assert_eq!(snapshot.assignments[0].grade, Some(Grade::Numeric(88.0)));

    let store = PlannerStore::from_snapshot(snapshot, DeletePolicy::Cascade);
    assert_eq!(store.ids().peek(studyplan_core::store::ids::IdKind::Assignment), 4);
}

#[test]
fn blank_legacy_grades_load_as_ungraded() {
    let mut backend = MemoryKeyValueStore::new();
    backend
        .save(
            "assignments",
            r#"[{"id":1,"title":"HW","subject":"Math","semesterId":1,"dueDate":"2025-09-01","dueTime":"10:00","priority":"medium","status":"completed","grade":""},{"id":2,"title":"Quiz","subject":"Math","semesterId":1,"dueDate":"2025-09-02","dueTime":"10:00","priority":"medium","status":"completed","grade":"90"}]"#,
        )
        .unwrap();
    let snapshot = load_snapshot(&backend);
    assert_eq!(snapshot.assignments[0].grade, None);

    let report = grade_report(&snapshot.assignments, SemesterFilter::All);
    assert_eq!(report.graded_count, 1);
    assert_eq!(report.average, Some(90.0));
}

#[test]
fn legacy_todos_without_ids_receive_fresh_ids() {
    let mut backend = MemoryKeyValueStore::new();
    backend
        .save(
            "todos",
            r#"[{"text":"read","completed":false},{"text":"write","completed":true}]"#,
        )
        .unwrap();
    backend
        .save("idSequence", r#"{"nextTodo":7}"#)
        .unwrap();

    let snapshot = load_snapshot(&backend);
    assert_eq!(snapshot.todos.len(), 2);
    assert!(snapshot.todos[1].completed);

    let mut planner = Planner::open(backend, monday(), PlannerOptions::default());
    let ids: Vec<u64> = planner.todos().iter().map(|t| t.id).collect();
    assert_eq!(ids, [7, 8]);
    assert!(planner.dirty_keys().is_empty());

    let saved = load_snapshot(planner.backend());
    assert_eq!(saved.todos, planner.todos());
    assert_eq!(planner.toggle_todo(7).unwrap().text, "read");
    assert_eq!(planner.add_todo("review").unwrap().id, 9);
}

#[test]
fn maximal_loaded_id_refuses_new_ids_instead_of_overflowing() {
    let mut backend = MemoryKeyValueStore::new();
    backend
        .save(
            "todos",
            &format!(r#"[{{"id":{},"text":"edge","completed":false}}]"#, u64::MAX),
        )
        .unwrap();

    let mut planner = Planner::open(backend, monday(), PlannerOptions::default());
    assert_eq!(planner.todos()[0].id, u64::MAX);

    let err = planner.add_todo("one more").unwrap_err();
    assert!(matches!(
        err,
        PlannerError::Validation(ValidationError::IdsExhausted("todo"))
    ));
    assert_eq!(planner.todos().len(), 1);

    planner.create_subject("Math").unwrap();
    assert_eq!(planner.subjects(), ["Math".to_string()]);
}

#[test]
fn corrupt_keys_fall_back_independently() {
    let store = populated_store();
    let mut backend = MemoryKeyValueStore::new();
    save_all(&mut backend, &store);
    backend.save(storage_key(Collection::Lectures), "[{broken").unwrap();
    backend.save(storage_key(Collection::Profile), "42").unwrap();

    let loaded = load_snapshot(&backend);
    assert!(loaded.lectures.is_empty());
    assert_eq!(loaded.profile, Default::default());
    assert_eq!(loaded.assignments, store.assignments());
}

/// Backend whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryKeyValueStore,
    failing: bool,
}

impl KeyValueStore for FlakyStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.inner.load(key)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        if self.failing {
            return Err(PersistenceError::Backend("quota exceeded".to_string()));
        }
        self.inner.save(key, blob)
    }
}

#[test]
fn failed_write_keeps_state_and_retries_dirty_keys() {
    let clock = FixedClock::new(
        NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
    );
    let mut planner = Planner::open(FlakyStore::default(), clock, PlannerOptions::default());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    planner.subscribe(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone()));

    planner.backend_mut().failing = true;
    let todo = planner.add_todo("Survive offline").unwrap();
    assert_eq!(planner.todos().len(), 1);
    assert!(planner.dirty_keys().contains(&"todos"));
    assert!(events.borrow().iter().any(|event| matches!(
        event,
        ChangeEvent::PersistenceFailed { key: "todos", .. }
    )));
    assert!(matches!(
        planner.flush(),
        Err(PersistenceError::Backend(_))
    ));

    planner.backend_mut().failing = false;
    planner.flush().unwrap();
    assert!(planner.dirty_keys().is_empty());

    let reloaded = load_snapshot(&planner.backend().inner);
    assert_eq!(reloaded.todos.len(), 1);
    assert_eq!(reloaded.todos[0].id, todo.id);
}

#[test]
fn dirty_keys_are_retried_by_the_next_mutation() {
    let clock = FixedClock::new(
        NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
    );
    let mut planner = Planner::open(FlakyStore::default(), clock, PlannerOptions::default());
    planner.backend_mut().failing = true;
    planner.create_subject("Math").unwrap();
    assert!(planner.dirty_keys().contains(&"subjects"));

    planner.backend_mut().failing = false;
    planner.set_dark_mode(true).unwrap();
    assert!(planner.dirty_keys().is_empty());
    assert_eq!(planner.backend().inner.get("subjects"), Some(r#"["Math"]"#));
    assert_eq!(planner.backend().inner.get("darkMode"), Some("enabled"));
}
