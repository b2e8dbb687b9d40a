use studyplan_core::timer::{ManualTickScheduler, TickToken, TimerPhase};
use studyplan_core::{FocusTimer, SessionKind, TickOutcome, TimerSettings};

fn short_settings() -> TimerSettings {
    TimerSettings {
        work_secs: 3,
        short_break_secs: 2,
        long_break_secs: 4,
        long_break_every: 2,
    }
}

fn active(timer: &FocusTimer<ManualTickScheduler>) -> TickToken {
    let tokens = timer.scheduler().active_tokens();
    assert_eq!(tokens.len(), 1, "exactly one schedule must be active");
    tokens[0]
}

fn run_session(timer: &mut FocusTimer<ManualTickScheduler>) -> TickOutcome {
    timer.start();
    let token = active(timer);
    loop {
        match timer.on_tick(token) {
            TickOutcome::Ticked { .. } => continue,
            outcome => return outcome,
        }
    }
}

#[test]
fn new_timer_is_idle_work_session() {
    let timer = FocusTimer::new(TimerSettings::default(), ManualTickScheduler::new());
    let snapshot = timer.snapshot();
    assert_eq!(snapshot.phase, TimerPhase::Idle);
    assert_eq!(snapshot.session, SessionKind::Work);
    assert_eq!(timer.display(), "25:00");
}

#[test]
fn ticks_count_down_one_second() {
    let mut timer = FocusTimer::new(short_settings(), ManualTickScheduler::new());
    timer.start();
    let token = active(&timer);
    assert_eq!(
        timer.on_tick(token),
        TickOutcome::Ticked { remaining_secs: 2 }
    );
    assert_eq!(timer.display(), "00:02");
}

#[test]
fn sessions_alternate_with_long_break_every_nth_work_session() {
    let mut timer = FocusTimer::new(short_settings(), ManualTickScheduler::new());
    let expected = [
        (SessionKind::Work, SessionKind::ShortBreak),
        (SessionKind::ShortBreak, SessionKind::Work),
        (SessionKind::Work, SessionKind::LongBreak),
        (SessionKind::LongBreak, SessionKind::Work),
        (SessionKind::Work, SessionKind::ShortBreak),
    ];
    for (finished, next) in expected {
        assert_eq!(
            run_session(&mut timer),
            TickOutcome::SessionCompleted { finished, next }
        );
        assert_eq!(timer.snapshot().phase, TimerPhase::Idle);
        assert!(timer.scheduler().active_tokens().is_empty());
    }
    assert_eq!(timer.snapshot().completed_work_sessions, 3);
}

#[test]
fn restart_cancels_previous_schedule_and_ignores_its_ticks() {
    let mut timer = FocusTimer::new(short_settings(), ManualTickScheduler::new());
    timer.start();
    let stale = active(&timer);
    timer.start();
    let fresh = active(&timer);
    assert_ne!(stale, fresh);

    assert_eq!(timer.on_tick(stale), TickOutcome::Ignored);
    assert_eq!(timer.snapshot().remaining_secs, 3);
    assert_eq!(
        timer.on_tick(fresh),
        TickOutcome::Ticked { remaining_secs: 2 }
    );
}

#[test]
fn pause_stops_ticking_and_start_resumes_remaining_time() {
    let mut timer = FocusTimer::new(short_settings(), ManualTickScheduler::new());
    timer.toggle();
    let token = active(&timer);
    timer.on_tick(token);

    timer.toggle();
    assert_eq!(timer.snapshot().phase, TimerPhase::Paused);
    assert!(timer.scheduler().active_tokens().is_empty());
    assert_eq!(timer.on_tick(token), TickOutcome::Ignored);

    timer.toggle();
    assert_eq!(timer.snapshot().phase, TimerPhase::Running);
    assert_eq!(timer.snapshot().remaining_secs, 2);
}

#[test]
fn reset_returns_to_idle_work_session_and_zeroes_counter() {
    let mut timer = FocusTimer::new(short_settings(), ManualTickScheduler::new());
    run_session(&mut timer);
    timer.start();
    let token = active(&timer);
    timer.reset();

    let snapshot = timer.snapshot();
    assert_eq!(snapshot.phase, TimerPhase::Idle);
    assert_eq!(snapshot.session, SessionKind::Work);
    assert_eq!(snapshot.remaining_secs, 3);
    assert_eq!(snapshot.completed_work_sessions, 0);
    assert!(timer.scheduler().active_tokens().is_empty());
    assert_eq!(timer.on_tick(token), TickOutcome::Ignored);
}
