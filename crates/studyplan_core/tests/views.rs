use chrono::{NaiveDate, NaiveDateTime};
use studyplan_core::store::PlannerStore;
use studyplan_core::views::calendar::{calendar_events, fixed_holidays};
use studyplan_core::views::filters::{
    filter_assignments, filter_lectures, today_schedule, upcoming_deadlines,
};
use studyplan_core::{
    EventCategory, EventRef, NewAssignment, NewLecture, NewSemester, SemesterFilter, StatusFilter,
};

fn at(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
}

fn semester(store: &mut PlannerStore, name: &str, start: &str, end: &str) -> u64 {
    store
        .create_semester(&NewSemester {
            name: name.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        })
        .unwrap()
        .id
}

fn assignment(store: &mut PlannerStore, title: &str, semester_id: u64, due: (&str, &str)) -> u64 {
    store
        .create_assignment(&NewAssignment {
            title: title.to_string(),
            subject: "Math".to_string(),
            semester_id: Some(semester_id),
            due_date: due.0.to_string(),
            due_time: due.1.to_string(),
            priority: "low".to_string(),
        })
        .unwrap()
        .id
}

fn lecture(store: &mut PlannerStore, title: &str, semester_id: u64, when: (&str, &str)) -> u64 {
    store
        .create_lecture(&NewLecture {
            title: title.to_string(),
            subject: "Math".to_string(),
            semester_id: Some(semester_id),
            date: when.0.to_string(),
            time: when.1.to_string(),
            location: "Hall A".to_string(),
            duration_minutes: Some(50),
        })
        .unwrap()
        .id
}

fn titles<'a>(items: impl IntoIterator<Item = &'a studyplan_core::Assignment>) -> Vec<&'a str> {
    items.into_iter().map(|a| a.title.as_str()).collect()
}

fn seeded() -> (PlannerStore, u64, u64) {
    let mut store = PlannerStore::default();
    store.create_subject("Math").unwrap();
    let fall = semester(&mut store, "Fall", "2025-08-01", "2025-12-15");
    let spring = semester(&mut store, "Spring", "2026-01-10", "2026-05-30");
    (store, fall, spring)
}

#[test]
fn assignments_sort_by_due_moment_with_stable_ties() {
    let (mut store, fall, spring) = seeded();
    assignment(&mut store, "late", fall, ("2025-11-01", "09:00"));
    assignment(&mut store, "tie-first", spring, ("2025-10-01", "09:00"));
    assignment(&mut store, "early", fall, ("2025-10-01", "08:00"));
    assignment(&mut store, "tie-second", fall, ("2025-10-01", "09:00"));

    let now = at("2025-09-01", "00:00");
    let all = filter_assignments(
        store.assignments(),
        StatusFilter::All,
        SemesterFilter::All,
        now,
    );
    assert_eq!(titles(all), ["early", "tie-first", "tie-second", "late"]);

    let fall_only = filter_assignments(
        store.assignments(),
        StatusFilter::All,
        SemesterFilter::Only(fall),
        now,
    );
    assert_eq!(titles(fall_only), ["early", "tie-second", "late"]);
}

#[test]
fn overdue_is_derived_from_now_and_pending_status() {
    let (mut store, fall, _) = seeded();
    let old = assignment(&mut store, "ancient", fall, ("2020-01-01", "00:00"));
    let done = assignment(&mut store, "finished", fall, ("2020-01-01", "00:00"));
    assignment(&mut store, "future", fall, ("2099-01-01", "00:00"));
    store.toggle_assignment_status(done).unwrap();

    let now = at("2025-09-01", "12:00");
    let overdue = filter_assignments(
        store.assignments(),
        StatusFilter::Overdue,
        SemesterFilter::All,
        now,
    );
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, old);

    let exactly_due = filter_assignments(
        store.assignments(),
        StatusFilter::Overdue,
        SemesterFilter::All,
        at("2020-01-01", "00:00"),
    );
    assert!(exactly_due.is_empty());

    let completed = filter_assignments(
        store.assignments(),
        StatusFilter::Completed,
        SemesterFilter::All,
        now,
    );
    assert_eq!(titles(completed), ["finished"]);
}

#[test]
fn filtering_is_idempotent() {
    let (mut store, fall, spring) = seeded();
    for (n, semester_id) in [fall, spring, fall, spring].into_iter().enumerate() {
        assignment(&mut store, &format!("a{n}"), semester_id, ("2025-10-01", "09:00"));
    }
    let now = at("2025-09-01", "00:00");
    let first: Vec<u64> = filter_assignments(
        store.assignments(),
        StatusFilter::Pending,
        SemesterFilter::All,
        now,
    )
    .iter()
    .map(|a| a.id)
    .collect();
    let second: Vec<u64> = filter_assignments(
        store.assignments(),
        StatusFilter::Pending,
        SemesterFilter::All,
        now,
    )
    .iter()
    .map(|a| a.id)
    .collect();
    assert_eq!(first, second);
}

#[test]
fn upcoming_deadlines_are_pending_future_and_truncated() {
    let (mut store, fall, _) = seeded();
    assignment(&mut store, "past", fall, ("2025-08-15", "09:00"));
    for day in 10..18 {
        assignment(&mut store, &format!("day {day}"), fall, (&format!("2025-09-{day}"), "09:00"));
    }
    let completed = assignment(&mut store, "done", fall, ("2025-09-05", "09:00"));
    store.toggle_assignment_status(completed).unwrap();

    let upcoming = upcoming_deadlines(store.assignments(), at("2025-09-01", "00:00"), 5);
    assert_eq!(
        titles(upcoming),
        ["day 10", "day 11", "day 12", "day 13", "day 14"]
    );
}

#[test]
fn lectures_filter_and_today_schedule_sort_by_time() {
    let (mut store, fall, spring) = seeded();
    lecture(&mut store, "afternoon", fall, ("2025-09-15", "14:00"));
    lecture(&mut store, "morning", fall, ("2025-09-15", "08:00"));
    lecture(&mut store, "spring", spring, ("2026-02-01", "08:00"));
    lecture(&mut store, "earlier day", fall, ("2025-09-14", "18:00"));

    let fall_titles: Vec<&str> = filter_lectures(store.lectures(), SemesterFilter::Only(fall))
        .iter()
        .map(|l| l.title.as_str())
        .collect();
    assert_eq!(fall_titles, ["earlier day", "morning", "afternoon"]);

    let today = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
    let todays: Vec<&str> = today_schedule(store.lectures(), today)
        .iter()
        .map(|l| l.title.as_str())
        .collect();
    assert_eq!(todays, ["morning", "afternoon"]);
}

#[test]
fn calendar_events_cover_lectures_pending_assignments_and_holidays() {
    let (mut store, fall, spring) = seeded();
    let lecture_id = lecture(&mut store, "Limits", fall, ("2025-09-15", "08:00"));
    let pending = assignment(&mut store, "HW1", fall, ("2025-09-20", "23:59"));
    let done = assignment(&mut store, "HW0", fall, ("2025-09-10", "23:59"));
    assignment(&mut store, "Spring HW", spring, ("2026-02-01", "10:00"));
    store.toggle_assignment_status(done).unwrap();

    let holidays = fixed_holidays(2025..=2025);
    let events = calendar_events(
        store.lectures(),
        store.assignments(),
        &holidays,
        SemesterFilter::Only(fall),
    );

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert!(ids.contains(&format!("lecture:{lecture_id}").as_str()));
    assert!(ids.contains(&format!("assignment:{pending}").as_str()));
    assert!(!ids.contains(&format!("assignment:{done}").as_str()));
    assert!(ids.contains(&"holiday:2025-12-25"));
    assert_eq!(
        events
            .iter()
            .filter(|e| e.category == EventCategory::Assignment)
            .count(),
        1
    );

    let lecture_event = events
        .iter()
        .find(|e| e.category == EventCategory::Lecture)
        .unwrap();
    assert_eq!(lecture_event.end, Some(at("2025-09-15", "08:50")));
    assert!(events.windows(2).all(|pair| pair[0].start <= pair[1].start));

    let reference: EventRef = lecture_event.id.parse().unwrap();
    assert_eq!(reference, EventRef::Lecture(lecture_id));
}
