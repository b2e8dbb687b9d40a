//! Terminal front end for the study planner.
//!
//! # Responsibility
//! - Resolve configuration from `.env`, the environment and flags.
//! - Open the planner over the SQLite blob store and run one command.
//! - Drive the focus timer from a thread-backed tick scheduler.

mod render;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use studyplan_core::timer::ThreadTickScheduler;
use studyplan_core::{
    init_logging, ChangeEvent, FocusTimer, KeyValueStore, NewAssignment, NewLecture, NewSemester,
    Planner, PlannerConfig, ProfileUpdate, SemesterFilter, SqliteKeyValueStore, StatusFilter,
    TickOutcome, TimerSettings,
};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "studyplan", version, about = "Personal academic planner")]
struct Args {
    /// Data directory (overrides STUDYPLAN_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Counters, upcoming deadlines and today's lectures
    Dashboard,
    Subjects,
    AddSubject {
        name: String,
    },
    /// Deletes a subject under the configured delete policy
    DeleteSubject {
        name: String,
    },
    Semesters,
    AddSemester {
        name: String,
        /// YYYY-MM-DD
        start: String,
        /// YYYY-MM-DD
        end: String,
    },
    DeleteSemester {
        id: u64,
    },
    Assignments {
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long, default_value = "all")]
        semester: SemesterFilter,
    },
    AddAssignment {
        title: String,
        subject: String,
        semester: u64,
        /// YYYY-MM-DD
        due_date: String,
        /// HH:MM
        due_time: String,
        #[arg(long, default_value = "medium")]
        priority: String,
    },
    /// Flips pending/completed
    Toggle {
        id: u64,
    },
    /// Records a grade such as `95`, `87.5%` or `A+`
    Grade {
        id: u64,
        grade: String,
    },
    DeleteAssignment {
        id: u64,
    },
    Lectures {
        #[arg(long, default_value = "all")]
        semester: SemesterFilter,
    },
    AddLecture {
        title: String,
        subject: String,
        semester: u64,
        /// YYYY-MM-DD
        date: String,
        /// HH:MM
        time: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        duration: Option<u32>,
    },
    DeleteLecture {
        id: u64,
    },
    Today,
    Grades {
        #[arg(long, default_value = "all")]
        semester: SemesterFilter,
    },
    Calendar {
        #[arg(long, default_value = "all")]
        semester: SemesterFilter,
        /// Only events on or after this date
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Deletes the entity behind a calendar event id
    DeleteEvent {
        event_id: String,
    },
    Todos,
    AddTodo {
        text: String,
    },
    ToggleTodo {
        id: u64,
    },
    DeleteTodo {
        id: u64,
    },
    Profile,
    SetProfile {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        student_id: String,
        #[arg(long, default_value = "")]
        major: String,
        #[arg(long, default_value = "")]
        year: String,
    },
    SetPicture {
        picture_ref: String,
    },
    /// Dark mode on or off
    Theme {
        #[arg(value_parser = ["on", "off"])]
        mode: String,
    },
    Activity,
    /// Runs focus sessions in the foreground
    Focus {
        #[arg(long, default_value_t = 1)]
        sessions: u32,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult {
    let mut config = PlannerConfig::from_env()?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    std::fs::create_dir_all(&config.data_dir)?;

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    if let Err(err) = init_logging(config.log_level, &log_dir.canonicalize()?) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let backend = SqliteKeyValueStore::open(config.database_path())?;
    let mut planner = Planner::open_with_system_clock(backend, config.planner_options());
    planner.subscribe(|event: &ChangeEvent| {
        if let ChangeEvent::PersistenceFailed { key, message } = event {
            eprintln!("warning: could not save {key}: {message}");
        }
    });

    execute(&mut planner, args.command, config.timer)
}

fn execute<B: KeyValueStore>(
    planner: &mut Planner<B>,
    command: Command,
    timer: TimerSettings,
) -> CliResult {
    match command {
        Command::Dashboard => render::dashboard(planner),
        Command::Subjects => render::subjects(planner.subjects()),
        Command::AddSubject { name } => {
            let name = planner.create_subject(&name)?;
            println!("added subject {name}");
        }
        Command::DeleteSubject { name } => {
            let report = planner.delete_subject(&name)?;
            render::deletion("subject", &report);
        }
        Command::Semesters => render::semesters(planner.semesters()),
        Command::AddSemester { name, start, end } => {
            let semester = planner.create_semester(&NewSemester {
                name,
                start_date: start,
                end_date: end,
            })?;
            println!("added semester #{}", semester.id);
        }
        Command::DeleteSemester { id } => {
            let report = planner.delete_semester(id)?;
            render::deletion("semester", &report);
        }
        Command::Assignments { status, semester } => {
            render::assignments(&planner.list_assignments(status, semester));
        }
        Command::AddAssignment {
            title,
            subject,
            semester,
            due_date,
            due_time,
            priority,
        } => {
            let assignment = planner.create_assignment(&NewAssignment {
                title,
                subject,
                semester_id: Some(semester),
                due_date,
                due_time,
                priority,
            })?;
            println!("added assignment #{}", assignment.id);
        }
        Command::Toggle { id } => {
            let assignment = planner.toggle_assignment_status(id)?;
            println!("assignment #{id} is now {}", assignment.status.as_str());
        }
        Command::Grade { id, grade } => {
            let assignment = planner.grade_assignment(id, &grade)?;
            if let Some(grade) = &assignment.grade {
                println!("assignment #{id} graded {grade}");
            }
        }
        Command::DeleteAssignment { id } => {
            planner.delete_assignment(id)?;
            println!("deleted assignment #{id}");
        }
        Command::Lectures { semester } => render::lectures(&planner.list_lectures(semester)),
        Command::AddLecture {
            title,
            subject,
            semester,
            date,
            time,
            location,
            duration,
        } => {
            let lecture = planner.create_lecture(&NewLecture {
                title,
                subject,
                semester_id: Some(semester),
                date,
                time,
                location,
                duration_minutes: duration,
            })?;
            println!("added lecture #{}", lecture.id);
        }
        Command::DeleteLecture { id } => {
            planner.delete_lecture(id)?;
            println!("deleted lecture #{id}");
        }
        Command::Today => render::lectures(&planner.today_schedule()),
        Command::Grades { semester } => render::grades(&planner.grade_report(semester)),
        Command::Calendar { semester, from } => {
            let events = planner.calendar_events(semester);
            render::calendar(
                events
                    .iter()
                    .filter(|event| from.map_or(true, |from| event.start.date() >= from)),
            );
        }
        Command::DeleteEvent { event_id } => {
            let reference = planner.delete_event(&event_id)?;
            println!("deleted {reference}");
        }
        Command::Todos => render::todos(planner.todos()),
        Command::AddTodo { text } => {
            let todo = planner.add_todo(&text)?;
            println!("added todo #{}", todo.id);
        }
        Command::ToggleTodo { id } => {
            let todo = planner.toggle_todo(id)?;
            println!(
                "todo #{id} is now {}",
                if todo.completed { "done" } else { "open" }
            );
        }
        Command::DeleteTodo { id } => {
            planner.delete_todo(id)?;
            println!("deleted todo #{id}");
        }
        Command::Profile => render::profile(planner.profile()),
        Command::SetProfile {
            name,
            email,
            phone,
            student_id,
            major,
            year,
        } => {
            let profile = planner.update_profile(&ProfileUpdate {
                full_name: name,
                email,
                phone,
                student_id,
                major,
                year,
            })?;
            render::profile(&profile);
        }
        Command::SetPicture { picture_ref } => {
            planner.set_profile_picture(&picture_ref)?;
            println!("profile picture updated");
        }
        Command::Theme { mode } => {
            let enabled = planner.set_dark_mode(mode == "on")?;
            println!("dark mode {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Activity => render::activity(&planner.recent_activity()),
        Command::Focus { sessions } => focus(timer, sessions)?,
    }
    Ok(())
}

fn focus(settings: TimerSettings, sessions: u32) -> CliResult {
    let (scheduler, ticks) = ThreadTickScheduler::new();
    let mut timer = FocusTimer::new(settings, scheduler);
    let mut completed = 0;
    info!("event=focus_run module=cli status=start sessions={sessions}");

    timer.start();
    println!("{}: {}", timer.snapshot().session, timer.display());
    while completed < sessions {
        let token = ticks.recv_timeout(Duration::from_secs(5))?;
        match timer.on_tick(token) {
            TickOutcome::Ignored => {}
            TickOutcome::Ticked { remaining_secs } => {
                if remaining_secs % 60 == 0 || remaining_secs <= 10 {
                    println!("{}: {}", timer.snapshot().session, timer.display());
                }
            }
            TickOutcome::SessionCompleted { finished, next } => {
                completed += 1;
                println!("{finished} complete. Next up: {next}.");
                if completed < sessions {
                    timer.start();
                }
            }
        }
    }
    info!("event=focus_run module=cli status=ok sessions={completed}");
    Ok(())
}
