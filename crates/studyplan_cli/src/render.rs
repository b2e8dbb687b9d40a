//! Plain-text rendering of planner views.

use studyplan_core::model::ActivityLogEntry;
use studyplan_core::store::DeletionReport;
use studyplan_core::{
    Assignment, CalendarEvent, GradeReport, KeyValueStore, Lecture, Planner, Profile, Semester,
    Todo,
};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn dashboard<B: KeyValueStore>(planner: &Planner<B>) {
    let counters = planner.dashboard();
    println!(
        "assignments: {} total, {} completed, {} pending",
        counters.total, counters.completed, counters.pending
    );
    println!();
    println!("upcoming deadlines:");
    assignments(&planner.upcoming_deadlines());
    println!();
    println!("today:");
    lectures(&planner.today_schedule());
}

pub fn subjects(subjects: &[String]) {
    if subjects.is_empty() {
        println!("(no subjects)");
    }
    for subject in subjects {
        println!("{subject}");
    }
}

pub fn semesters(semesters: &[Semester]) {
    if semesters.is_empty() {
        println!("(no semesters)");
    }
    for semester in semesters {
        println!(
            "#{:<4} {:<20} {} .. {}",
            semester.id, semester.name, semester.start_date, semester.end_date
        );
    }
}

pub fn assignments(assignments: &[&Assignment]) {
    if assignments.is_empty() {
        println!("(no assignments)");
    }
    for assignment in assignments {
        let grade = assignment
            .grade
            .as_ref()
            .map(|grade| format!(" grade={grade}"))
            .unwrap_or_default();
        println!(
            "#{:<4} {} [{}|{}] {} ({}){grade}",
            assignment.id,
            assignment.due_at().format(DATE_TIME_FORMAT),
            assignment.status.as_str(),
            assignment.priority.as_str(),
            assignment.title,
            assignment.subject,
        );
    }
}

pub fn lectures(lectures: &[&Lecture]) {
    if lectures.is_empty() {
        println!("(no lectures)");
    }
    for lecture in lectures {
        let location = if lecture.location.is_empty() {
            String::new()
        } else {
            format!(" @ {}", lecture.location)
        };
        println!(
            "#{:<4} {} {}m {} ({}){location}",
            lecture.id,
            lecture.starts_at().format(DATE_TIME_FORMAT),
            lecture.duration_minutes,
            lecture.title,
            lecture.subject,
        );
    }
}

pub fn grades(report: &GradeReport) {
    let average = report
        .average
        .map(|value| format!("{value:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    let gpa = report
        .gpa
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "average: {average}  gpa: {gpa}  graded: {}",
        report.graded_count
    );
    for card in &report.subjects {
        let letter = card
            .letter
            .map(|letter| letter.to_string())
            .unwrap_or_else(|| "-".to_string());
        let average = card
            .average
            .map(|value| format!("{value:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!();
        println!("{} {average} ({letter})", card.subject);
        for entry in &card.entries {
            println!("  #{:<4} {:<30} {}", entry.assignment_id, entry.title, entry.grade);
        }
    }
}

pub fn calendar<'a>(events: impl Iterator<Item = &'a CalendarEvent>) {
    for event in events {
        let when = if event.all_day {
            event.start.format("%Y-%m-%d").to_string()
        } else {
            event.start.format(DATE_TIME_FORMAT).to_string()
        };
        println!("{when:<16} {:<18} {}", event.id, event.title);
    }
}

pub fn todos(todos: &[Todo]) {
    if todos.is_empty() {
        println!("(no todos)");
    }
    for todo in todos {
        let mark = if todo.completed { "x" } else { " " };
        println!("#{:<4} [{mark}] {}", todo.id, todo.text);
    }
}

pub fn profile(profile: &Profile) {
    println!("name:       {}", profile.full_name);
    println!("email:      {}", profile.email);
    println!("phone:      {}", profile.phone);
    println!("student id: {}", profile.student_id);
    println!("major:      {}", profile.major);
    println!("year:       {}", profile.year);
    println!("picture:    {}", profile.picture_ref);
}

pub fn activity(entries: &[&ActivityLogEntry]) {
    if entries.is_empty() {
        println!("(no activity)");
    }
    for entry in entries {
        println!("{} {}", entry.timestamp.format(DATE_TIME_FORMAT), entry.message);
    }
}

pub fn deletion(kind: &str, report: &DeletionReport) {
    println!(
        "deleted {kind}; removed {} lecture(s) and {} assignment(s)",
        report.lectures_removed, report.assignments_removed
    );
}
